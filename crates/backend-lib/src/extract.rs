// ============================
// crates/backend-lib/src/extract.rs
// ============================
//! Request extractors that reject with [`AppError`].
use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json<T>` whose rejections (bad syntax, wrong shape, missing content type)
/// all become a 400 in the usual error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
