use actix_web::{http::StatusCode, HttpResponse, Responder};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success(T),
    #[serde(rename = "error")]
    Error(String),
}

impl ApiResponse<()> {
    /// Error envelope with the given status, for `ResponseError` impls.
    pub fn failure(status: StatusCode, message: impl ToString) -> HttpResponse {
        HttpResponse::build(status).json(ApiResponse::<()>::Error(message.to_string()))
    }
}

impl<T: Serialize> Responder for ApiResponse<T> {
    type Body = actix_web::body::BoxBody;
    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::Ok().json(self)
    }
}
