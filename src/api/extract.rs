//! Request extractors that answer rejections with a [`CommandReply`].

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::sdk::CommandReply;

/// JSON body extractor. A body that is missing, not JSON or the wrong shape
/// is rejected with an `invalid_request` reply (HTTP 400) instead of axum's
/// plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = CommandReply;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(CommandReply::invalid(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}
