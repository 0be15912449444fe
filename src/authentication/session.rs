use crate::{
    error::ApiError,
    permissions::ActionType,
    schema::{Id, User},
};

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: User,
}

impl SessionData {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> Id {
        self.user.id
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Owners need `own`; everybody else needs `all`.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), ApiError> {
        if owner_id == self.user.id {
            self.authenticate(own)
        } else {
            self.authenticate(all)
        }
    }
}
