use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::core::models::feed::{FeedCriteria, FeedItem, FeedPage, PopularBy, Tab, PAGE_SIZE};
use crate::core::models::survey::{EnrichedSurvey, Visibility};

/// Fixed vote weight for the plain popularity score.
const SCORE_VOTE_WEIGHT: i64 = 3;
/// Vote weight inside the trending numerator.
const TRENDING_VOTE_WEIGHT: f64 = 10.0;

/// Age-decayed popularity: `(votes*10 + views) / (age_hours + 2)^1.2`,
/// with age floored at half an hour so brand-new surveys do not divide
/// by a vanishing denominator.
pub fn trending_score(s: &EnrichedSurvey, now: DateTime<Utc>) -> f64 {
    let age_hours = ((now - s.survey.created_at).num_seconds() as f64 / 3600.0).max(0.5);
    let raw = s.total_votes as f64 * TRENDING_VOTE_WEIGHT + s.survey.view_count.max(0) as f64;
    raw / (age_hours + 2.0).powf(1.2)
}

pub fn popularity_score(s: &EnrichedSurvey) -> i64 {
    s.total_votes * SCORE_VOTE_WEIGHT + s.survey.view_count.max(0) as i64
}

fn passes_filters(s: &EnrichedSurvey, criteria: &FeedCriteria, now: DateTime<Utc>) -> bool {
    let owned = criteria
        .viewer_id
        .as_deref()
        .map(|v| s.survey.is_owned_by(v))
        .unwrap_or(false);
    // only public surveys get listed, plus the viewer's own
    if s.survey.visibility != Visibility::Public && !owned {
        return false;
    }
    // Remaining order is contractual: text, category, tag, lifecycle/tab.
    if !criteria.search_text.is_empty() {
        let needle = criteria.search_text.to_lowercase();
        if !s.survey.title.to_lowercase().contains(&needle) {
            return false;
        }
    }
    if criteria.category != "all" && s.survey.category.as_deref() != Some(criteria.category.as_str()) {
        return false;
    }
    if let Some(tag) = &criteria.tag {
        if !s.survey.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if s.survey.is_ended(now) {
        return criteria.tab == Tab::Ended || (criteria.tab == Tab::Mine && owned);
    }
    match criteria.tab {
        Tab::Ended => false,
        Tab::Watching => criteria.watched.contains(&s.survey.id),
        Tab::Mine => owned,
        Tab::Latest | Tab::Popular => true,
    }
}

fn sort_feed(list: &mut Vec<EnrichedSurvey>, criteria: &FeedCriteria, now: DateTime<Utc>) {
    // Ties resolve by survey id ascending so the order is total and
    // reproducible regardless of fetch order.
    let by_id = |a: &EnrichedSurvey, b: &EnrichedSurvey| a.survey.id.cmp(&b.survey.id);
    if criteria.tab != Tab::Popular {
        list.sort_by(|a, b| b.survey.created_at.cmp(&a.survey.created_at).then_with(|| by_id(a, b)));
        return;
    }
    match criteria.popular_by {
        PopularBy::Trending => {
            let mut keyed: Vec<(f64, EnrichedSurvey)> =
                list.drain(..).map(|s| (trending_score(&s, now), s)).collect();
            keyed.sort_by(|(ka, a), (kb, b)| {
                kb.partial_cmp(ka).unwrap_or(Ordering::Equal).then_with(|| by_id(a, b))
            });
            list.extend(keyed.into_iter().map(|(_, s)| s));
        }
        PopularBy::Score => {
            list.sort_by(|a, b| popularity_score(b).cmp(&popularity_score(a)).then_with(|| by_id(a, b)));
        }
        PopularBy::Votes => {
            list.sort_by(|a, b| b.total_votes.cmp(&a.total_votes).then_with(|| by_id(a, b)));
        }
        PopularBy::Views => {
            list.sort_by(|a, b| {
                b.survey.view_count.max(0).cmp(&a.survey.view_count.max(0)).then_with(|| by_id(a, b))
            });
        }
    }
}

/// Filters, ranks and paginates one feed view. Pure function of its
/// arguments; `now` is passed in so lifecycle decisions are testable.
/// Out-of-range pages yield an empty slice, never an error.
pub fn select_feed(enriched: &[EnrichedSurvey], criteria: &FeedCriteria, now: DateTime<Utc>) -> FeedPage {
    let mut survivors: Vec<EnrichedSurvey> = enriched
        .iter()
        .filter(|s| passes_filters(s, criteria, now))
        .cloned()
        .collect();
    sort_feed(&mut survivors, criteria, now);

    let total_pages = (survivors.len() as i64 + PAGE_SIZE as i64 - 1) / PAGE_SIZE as i64;
    let page = criteria.page.max(1);
    let start = ((page - 1) as usize).saturating_mul(PAGE_SIZE);
    let items = survivors
        .into_iter()
        .enumerate()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|(rank, survey)| FeedItem {
            rank_badge: if criteria.tab == Tab::Popular && rank < 3 {
                Some(rank as u8 + 1)
            } else {
                None
            },
            survey,
        })
        .collect();
    FeedPage { items, total_pages, page }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::core::models::survey::{Survey, Visibility};

    #[test]
    fn test_non_public_listed_only_for_owner() {
        let mut private = enriched("secret", Duration::hours(1), 0, 0);
        private.survey.visibility = Visibility::Private;
        private.survey.owner_id = Some("u1".into());
        assert!(select_feed(&[private.clone()], &criteria(Tab::Latest), Utc::now()).items.is_empty());
        let mut c = criteria(Tab::Latest);
        c.viewer_id = Some("u1".into());
        assert_eq!(select_feed(&[private], &c, Utc::now()).items.len(), 1);
    }

    fn enriched(title: &str, age: Duration, votes: i64, views: i32) -> EnrichedSurvey {
        let now = Utc::now();
        EnrichedSurvey {
            survey: Survey {
                id: Uuid::new_v4(),
                title: title.into(),
                category: None,
                tags: vec![],
                visibility: Visibility::Public,
                deadline: None,
                created_at: now - age,
                owner_id: None,
                view_count: views,
                likes_count: 0,
                image_url: None,
            },
            total_votes: votes,
            comment_count: 0,
        }
    }

    fn criteria(tab: Tab) -> FeedCriteria {
        FeedCriteria {
            tab,
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_is_newest_first() {
        let old = enriched("old", Duration::hours(5), 0, 0);
        let new = enriched("new", Duration::hours(1), 0, 0);
        let page = select_feed(&[old, new], &criteria(Tab::Latest), Utc::now());
        assert_eq!(page.items[0].survey.survey.title, "new");
        assert_eq!(page.items[1].survey.survey.title, "old");
    }

    #[test]
    fn test_filter_order_text_category_tag() {
        let mut a = enriched("ラーメン好き集合", Duration::hours(1), 0, 0);
        a.survey.category = Some("グルメ".into());
        a.survey.tags = vec!["麺".into()];
        let mut b = enriched("ラーメンとうどん", Duration::hours(1), 0, 0);
        b.survey.category = Some("暮らし".into());
        let mut c = criteria(Tab::Latest);
        c.search_text = "ラーメン".into();
        c.category = "グルメ".into();
        c.tag = Some("麺".into());
        let page = select_feed(&[a, b], &c, Utc::now());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].survey.survey.title, "ラーメン好き集合");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let s = enriched("Best JRPG Ever", Duration::hours(1), 0, 0);
        let mut c = criteria(Tab::Latest);
        c.search_text = "jrpg".into();
        assert_eq!(select_feed(&[s], &c, Utc::now()).items.len(), 1);
    }

    #[test]
    fn test_expired_deadline_excluded_from_latest_and_popular() {
        let now = Utc::now();
        let mut s = enriched("done", Duration::hours(2), 0, 0);
        s.survey.deadline = Some(now - Duration::seconds(1));
        assert!(select_feed(&[s.clone()], &criteria(Tab::Latest), now).items.is_empty());
        assert!(select_feed(&[s.clone()], &criteria(Tab::Popular), now).items.is_empty());
        assert_eq!(select_feed(&[s], &criteria(Tab::Ended), now).items.len(), 1);
    }

    #[test]
    fn test_thirty_day_auto_expiry_boundary() {
        let now = Utc::now();
        let expired = enriched("older", Duration::days(31), 0, 0);
        let fresh = enriched("newer", Duration::days(29), 0, 0);
        assert!(expired.survey.is_ended(now));
        assert!(!fresh.survey.is_ended(now));
        let page = select_feed(&[expired, fresh], &criteria(Tab::Latest), now);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].survey.survey.title, "newer");
    }

    #[test]
    fn test_ended_tab_excludes_live_surveys() {
        let live = enriched("live", Duration::hours(1), 0, 0);
        assert!(select_feed(&[live], &criteria(Tab::Ended), Utc::now()).items.is_empty());
    }

    #[test]
    fn test_watching_tab_uses_watched_set() {
        let watched = enriched("watched", Duration::hours(1), 0, 0);
        let ignored = enriched("ignored", Duration::hours(1), 0, 0);
        let mut c = criteria(Tab::Watching);
        c.watched.insert(watched.survey.id);
        let page = select_feed(&[watched, ignored], &c, Utc::now());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].survey.survey.title, "watched");
    }

    #[test]
    fn test_mine_tab_includes_own_ended_surveys() {
        let mut own = enriched("mine-old", Duration::days(40), 0, 0);
        own.survey.owner_id = Some("u1".into());
        let mut foreign = enriched("theirs", Duration::hours(1), 0, 0);
        foreign.survey.owner_id = Some("u2".into());
        let mut c = criteria(Tab::Mine);
        c.viewer_id = Some("u1".into());
        let page = select_feed(&[own, foreign], &c, Utc::now());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].survey.survey.title, "mine-old");
    }

    #[test]
    fn test_mine_tab_empty_for_anonymous() {
        let mut own = enriched("mine", Duration::hours(1), 0, 0);
        own.survey.owner_id = Some("u1".into());
        assert!(select_feed(&[own], &criteria(Tab::Mine), Utc::now()).items.is_empty());
    }

    #[test]
    fn test_trending_monotonic_in_votes() {
        let now = Utc::now();
        let a = enriched("a", Duration::hours(3), 10, 50);
        let b = enriched("b", Duration::hours(3), 4, 50);
        assert!(trending_score(&a, now) > trending_score(&b, now));
    }

    #[test]
    fn test_trending_decays_with_age() {
        let now = Utc::now();
        let young = enriched("young", Duration::hours(1), 10, 0);
        let old = enriched("old", Duration::hours(48), 10, 0);
        assert!(trending_score(&young, now) > trending_score(&old, now));
    }

    #[test]
    fn test_popular_score_weights_votes_three_to_one() {
        let s = enriched("s", Duration::hours(1), 7, 4);
        assert_eq!(popularity_score(&s), 25);
    }

    #[test]
    fn test_popular_sub_modes_order() {
        let now = Utc::now();
        let many_views = enriched("views", Duration::hours(1), 0, 100);
        let many_votes = enriched("votes", Duration::hours(1), 30, 0);
        let surveys = vec![many_views, many_votes];
        let mut c = criteria(Tab::Popular);
        c.popular_by = PopularBy::Votes;
        assert_eq!(select_feed(&surveys, &c, now).items[0].survey.survey.title, "votes");
        c.popular_by = PopularBy::Views;
        assert_eq!(select_feed(&surveys, &c, now).items[0].survey.survey.title, "views");
    }

    #[test]
    fn test_rank_badges_top_three_popular_only() {
        let now = Utc::now();
        let surveys: Vec<_> = (0..5).map(|i| enriched(&format!("s{i}"), Duration::hours(1), i, 0)).collect();
        let mut c = criteria(Tab::Popular);
        c.popular_by = PopularBy::Votes;
        let page = select_feed(&surveys, &c, now);
        let badges: Vec<_> = page.items.iter().map(|i| i.rank_badge).collect();
        assert_eq!(badges, vec![Some(1), Some(2), Some(3), None, None]);
        let latest = select_feed(&surveys, &criteria(Tab::Latest), now);
        assert!(latest.items.iter().all(|i| i.rank_badge.is_none()));
    }

    #[test]
    fn test_pagination_boundaries() {
        let surveys: Vec<_> = (0..43).map(|i| enriched(&format!("s{i}"), Duration::minutes(i), 0, 0)).collect();
        let mut c = criteria(Tab::Latest);
        let page1 = select_feed(&surveys, &c, Utc::now());
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.items.len(), 21);
        c.page = 3;
        assert_eq!(select_feed(&surveys, &c, Utc::now()).items.len(), 1);
        c.page = 4;
        let past_end = select_feed(&surveys, &c, Utc::now());
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_pages, 3);
    }

    #[test]
    fn test_absurd_page_number_yields_empty() {
        // page numbers far past the end must page to nothing, not panic
        let s = enriched("s", Duration::hours(1), 0, 0);
        let mut c = criteria(Tab::Latest);
        c.page = i64::MAX;
        let page = select_feed(&[s], &c, Utc::now());
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_create_then_vote_scenario() {
        // a fresh survey tops the latest feed with zero votes; one
        // accepted vote shows up, a second attempt from the same
        // device is a no-op
        use crate::core::models::comment::Comment;
        use crate::core::models::option::Opt;
        use crate::core::services::aggregate::aggregate;
        use crate::device::DeviceStore;

        let now = Utc::now();
        let mut snack = enriched("今日のおやつ", Duration::seconds(10), 0, 0).survey;
        snack.category = Some("グルメ".into());
        snack.deadline = Some(now + Duration::hours(1));
        let older = enriched("昨日のお題", Duration::hours(5), 0, 0).survey;
        let mut options = vec![
            Opt { id: Uuid::new_v4(), survey_id: snack.id, name: "A".into(), votes: 0 },
            Opt { id: Uuid::new_v4(), survey_id: snack.id, name: "B".into(), votes: 0 },
        ];
        let comments: Vec<Comment> = vec![];

        let feed = select_feed(&aggregate(vec![snack.clone(), older.clone()], &options, &comments), &criteria(Tab::Latest), now);
        assert_eq!(feed.items[0].survey.survey.title, "今日のおやつ");
        assert_eq!(feed.items[0].survey.total_votes, 0);

        let dir = std::env::temp_dir().join(format!("plaza-scenario-{}", Uuid::new_v4()));
        let devices = DeviceStore::new(dir.to_str().unwrap()).unwrap();
        assert_eq!(devices.has_voted("d1", snack.id).unwrap(), None);
        options[0].votes += 1;
        devices.record_vote("d1", snack.id, "A").unwrap();
        assert_eq!(devices.has_voted("d1", snack.id).unwrap(), Some("A".into()));
        // the second attempt never reaches the store
        if devices.has_voted("d1", snack.id).unwrap().is_none() {
            options[1].votes += 1;
        }
        let feed = select_feed(&aggregate(vec![snack, older], &options, &comments), &criteria(Tab::Latest), now);
        assert_eq!(feed.items[0].survey.total_votes, 1);
    }

    #[test]
    fn test_equal_scores_tie_break_by_id() {
        let now = Utc::now();
        let mut a = enriched("a", Duration::hours(1), 5, 0);
        let mut b = enriched("b", Duration::hours(1), 5, 0);
        a.survey.created_at = b.survey.created_at;
        let mut c = criteria(Tab::Popular);
        c.popular_by = PopularBy::Votes;
        let forward = select_feed(&[a.clone(), b.clone()], &c, now);
        let backward = select_feed(&[b, a], &c, now);
        let ids: Vec<_> = forward.items.iter().map(|i| i.survey.survey.id).collect();
        let ids_rev: Vec<_> = backward.items.iter().map(|i| i.survey.survey.id).collect();
        assert_eq!(ids, ids_rev);
    }
}
