use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::DrawService;

#[utoipa::path(
    get,
    path = "/draw/status",
    tag = "draw",
    responses(
        (status = 200, description = "获取奖池状态成功", body = DrawStatusResponse)
    )
)]
/// 抽奖页状态: 奖品列表、剩余总数、截止 / 彩排标记
pub async fn get_status(service: web::Data<DrawService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": service.status() })))
}

#[utoipa::path(
    post,
    path = "/draw",
    tag = "draw",
    request_body = DrawRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽奖成功", body = DrawResponse),
        (status = 400, description = "抽取数量不合法"),
        (status = 403, description = "需要管理员权限"),
        (status = 409, description = "库存不足或活动已截止"),
        (status = 502, description = "保存失败，库存已回滚")
    )
)]
/// 抽奖:
/// 1. 彩排模式不扣减库存
/// 2. 正式模式扣减并保存，保存失败则回滚
/// 3. 返回揭晓会话
pub async fn draw(
    service: web::Data<DrawService>,
    req: HttpRequest,
    request: web::Json<DrawRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match service.draw(request.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn draw_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/draw")
            .route("", web::post().to(draw))
            .route("/status", web::get().to(get_status)),
    );
}
