//! UseCase: 認証（attachUser）
//!
//! ベアラートークンを IdentityProvider で検証し、接続にユーザーを紐づけます。
//! WebSocket のアップグレード前検証と HTTP API の認証もここを通ります。

use std::sync::Arc;

use crate::domain::{
    AuthError, ConnectionId, ConnectionRepository, IdentityProvider, VerifiedUser,
};

use super::error::AuthenticateError;

pub struct AuthenticateUseCase {
    identity: Arc<dyn IdentityProvider>,
    connections: Arc<dyn ConnectionRepository>,
}

impl AuthenticateUseCase {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        connections: Arc<dyn ConnectionRepository>,
    ) -> Self {
        Self {
            identity,
            connections,
        }
    }

    /// トークンを検証する（接続への紐づけは行わない）
    pub async fn verify(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        self.identity.verify_token(token).await.inspect_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
        })
    }

    /// トークンを検証し、接続にユーザーを紐づける
    ///
    /// 既に別のユーザーとして認証済みの接続は乗り換えできません。
    /// 同じユーザーのトークンを再送した場合はそのまま受理します。
    pub async fn attach(
        &self,
        connection_id: &ConnectionId,
        token: &str,
    ) -> Result<VerifiedUser, AuthenticateError> {
        let user = self.verify(token).await?;

        if let Some(current) = self.connections.user_of(connection_id)? {
            if current.id != user.id {
                tracing::warn!(
                    "Connection '{}' tried to switch identity from '{}' to '{}'",
                    connection_id.as_str(),
                    current.id.as_str(),
                    user.id.as_str()
                );
                return Err(AuthenticateError::AlreadyAuthenticated(
                    current.id.into_string(),
                ));
            }
            return Ok(current);
        }

        self.connections.attach_user(connection_id, user.clone())?;
        tracing::info!(
            "Connection '{}' authenticated as '{}'",
            connection_id.as_str(),
            user.id.as_str()
        );
        Ok(user)
    }
}
