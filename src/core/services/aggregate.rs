use std::collections::HashMap;

use itertools::Itertools;
use uuid::Uuid;

use crate::core::models::{
    comment::Comment,
    option::Opt,
    survey::{EnrichedSurvey, Survey},
};

/// Joins independently fetched surveys, options and comments into one
/// enriched record per survey. Pure; the store offers no join of its
/// own, so the engine groups by survey id here. Missing child rows
/// simply leave the derived counts at zero, which is also how the
/// degraded path works when a child fetch fails and the caller passes
/// an empty slice.
pub fn aggregate(surveys: Vec<Survey>, options: &[Opt], comments: &[Comment]) -> Vec<EnrichedSurvey> {
    let votes_by_survey: HashMap<Uuid, i64> = options
        .iter()
        .map(|o| (o.survey_id, o.votes.max(0) as i64))
        .into_grouping_map()
        .sum();
    let comments_by_survey: HashMap<Uuid, i64> = comments
        .iter()
        .map(|c| (c.survey_id, 1i64))
        .into_grouping_map()
        .sum();
    surveys
        .into_iter()
        .map(|survey| {
            let total_votes = votes_by_survey.get(&survey.id).copied().unwrap_or(0);
            let comment_count = comments_by_survey.get(&survey.id).copied().unwrap_or(0);
            EnrichedSurvey {
                survey,
                total_votes,
                comment_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::core::models::comment::CommentBody;
    use crate::core::models::survey::Visibility;

    fn survey(id: Uuid) -> Survey {
        Survey {
            id,
            title: "t".into(),
            category: None,
            tags: vec![],
            visibility: Visibility::Public,
            deadline: None,
            created_at: Utc::now(),
            owner_id: None,
            view_count: 0,
            likes_count: 0,
            image_url: None,
        }
    }

    fn opt(survey_id: Uuid, votes: i32) -> Opt {
        Opt {
            id: Uuid::new_v4(),
            survey_id,
            name: "o".into(),
            votes,
        }
    }

    fn comment(survey_id: Uuid) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            survey_id,
            author: "a".into(),
            body: CommentBody::Active("hi".into()),
            reactions: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sums_votes_and_counts_comments() {
        let sid = Uuid::new_v4();
        let other = Uuid::new_v4();
        let enriched = aggregate(
            vec![survey(sid), survey(other)],
            &[opt(sid, 3), opt(sid, 5), opt(other, 7)],
            &[comment(sid), comment(sid), comment(other)],
        );
        assert_eq!(enriched[0].total_votes, 8);
        assert_eq!(enriched[0].comment_count, 2);
        assert_eq!(enriched[1].total_votes, 7);
        assert_eq!(enriched[1].comment_count, 1);
    }

    #[test]
    fn test_negative_votes_count_as_zero() {
        // a corrupted counter must not drag the sum down
        let sid = Uuid::new_v4();
        let enriched = aggregate(vec![survey(sid)], &[opt(sid, 3), opt(sid, -1), opt(sid, 5)], &[]);
        assert_eq!(enriched[0].total_votes, 8);
    }

    #[test]
    fn test_empty_children_default_to_zero() {
        let sid = Uuid::new_v4();
        let enriched = aggregate(vec![survey(sid)], &[], &[]);
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].total_votes, 0);
        assert_eq!(enriched[0].comment_count, 0);
    }

    #[test]
    fn test_one_output_per_input_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let enriched = aggregate(vec![survey(a), survey(b)], &[], &[]);
        assert_eq!(enriched.iter().map(|e| e.survey.id).collect::<Vec<_>>(), vec![a, b]);
    }
}
