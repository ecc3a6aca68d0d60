use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::UserProfile;
use crate::auth::repo_types::User;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub fitness_goal: Option<String>,
    pub dietary_preference: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProfileResponse {
    pub fn new(user: User, profile: Option<UserProfile>) -> Self {
        let profile = profile.unwrap_or_default();
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            age: profile.age,
            height: profile.height,
            weight: profile.weight,
            fitness_goal: profile.goal,
            dietary_preference: profile.lifestyle,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub age: Option<i32>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub goal: Option<String>,
    pub lifestyle: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.age.is_some_and(|a| !(1..=150).contains(&a)) {
            return Err("age out of range");
        }
        if self.height.is_some_and(|h| !h.is_finite() || h <= 0.0) {
            return Err("height must be positive");
        }
        if self.weight.is_some_and(|w| !w.is_finite() || w <= 0.0) {
            return Err("weight must be positive");
        }
        Ok(())
    }
}
