use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::ShippingService;

#[utoipa::path(
    post,
    path = "/shipping",
    tag = "shipping",
    request_body = SubmitShippingRequest,
    responses(
        (status = 200, description = "配送信息已提交", body = ShippingRecordResponse),
        (status = 400, description = "未同意或信息不完整"),
        (status = 409, description = "会话不在配送信息收集阶段")
    )
)]
/// 提交配送信息；成功后会话回到汇总页
pub async fn submit(
    service: web::Data<ShippingService>,
    request: web::Json<SubmitShippingRequest>,
) -> Result<HttpResponse> {
    match service.submit(request.into_inner()).await {
        Ok(record) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            record,
            "配送信息已提交",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn shipping_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/shipping").route("", web::post().to(submit)));
}
