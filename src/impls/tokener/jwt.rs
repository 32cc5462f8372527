use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;

/// Claims of the session token the auth provider issues after its
/// OAuth handshake. The handshake itself is not this crate's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaim {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub exp: i64,
}

impl Payload for SessionClaim {
    fn user(&self) -> &str {
        &self.sub
    }
}

pub struct JWT {
    secret: Vec<u8>,
}

impl JWT {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl<P> Tokener<P> for JWT
where
    P: Payload,
{
    fn gen_token(&self, payload: &P) -> Result<String, Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(&self.secret);
        let token = encode(&header, payload, &key)?;
        Ok(token)
    }

    fn verify_token(&self, token: &str) -> Result<P, Error> {
        let key = DecodingKey::from_secret(&self.secret);
        let validation = Validation::new(Algorithm::HS256);
        let payload = decode(token, &key, &validation)?;
        Ok(payload.claims)
    }
}
