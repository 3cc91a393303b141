use std::sync::Arc;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn update_name(
        &self,
        user_id: Option<String>,
        full_name: Option<String>,
    ) -> Result<(), DomainError> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (Some(user_id), Some(full_name)) = (present(user_id), present(full_name)) else {
            return Err(DomainError::validation("userId and name are required"));
        };

        let repo = self.repo.clone();
        let updated = run_blocking(
            move || repo.update_full_name(&user_id, &full_name),
            DomainError::Persistence,
        )
        .await?;

        if updated {
            Ok(())
        } else {
            Err(DomainError::NotFound)
        }
    }
}
