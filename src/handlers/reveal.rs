use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::*;
use crate::services::RevealService;

fn respond(result: AppResult<RevealView>) -> Result<HttpResponse> {
    match result {
        Ok(view) => Ok(HttpResponse::Ok().json(ApiResponse::success(view))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reveal/{session_id}",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "当前揭晓状态", body = RevealView),
        (status = 404, description = "会话不存在")
    )
)]
pub async fn get_session(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(service.view(path.into_inner()).await)
}

#[utoipa::path(
    post,
    path = "/reveal/{session_id}/disclose/{index}",
    tag = "reveal",
    params(
        ("session_id" = Uuid, Path, description = "揭晓会话ID"),
        ("index" = usize, Path, description = "结果序号（从0开始）")
    ),
    responses(
        (status = 200, description = "已揭晓", body = RevealView),
        (status = 409, description = "当前状态不允许揭晓")
    )
)]
/// 点击揭晓高等级奖品；会先触发庆祝效果，短暂延迟后返回
pub async fn disclose(
    service: web::Data<RevealService>,
    path: web::Path<(Uuid, usize)>,
) -> Result<HttpResponse> {
    let (session_id, index) = path.into_inner();
    respond(service.disclose(session_id, index).await)
}

#[utoipa::path(
    post,
    path = "/reveal/{session_id}/summary",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "查看全部结果", body = RevealView),
        (status = 409, description = "当前状态不允许")
    )
)]
pub async fn show_summary(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(service.show_summary(path.into_inner()).await)
}

#[utoipa::path(
    post,
    path = "/reveal/{session_id}/shipping",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "打开配送信息表单", body = RevealView),
        (status = 409, description = "没有需要配送的奖品")
    )
)]
pub async fn open_shipping(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(service.open_shipping(path.into_inner()).await)
}

#[utoipa::path(
    delete,
    path = "/reveal/{session_id}/shipping",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "关闭表单，回到汇总", body = RevealView)
    )
)]
pub async fn close_shipping(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(service.close_shipping(path.into_inner()).await)
}

#[utoipa::path(
    post,
    path = "/reveal/{session_id}/finish",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "会话结束", body = RevealView)
    )
)]
pub async fn finish(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(service.finish(path.into_inner()).await)
}

#[utoipa::path(
    delete,
    path = "/reveal/{session_id}",
    tag = "reveal",
    params(("session_id" = Uuid, Path, description = "揭晓会话ID")),
    responses(
        (status = 200, description = "会话已丢弃（已提交的库存不回滚）"),
        (status = 404, description = "会话不存在")
    )
)]
pub async fn cancel(
    service: web::Data<RevealService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.cancel(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn reveal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reveal/{session_id}")
            .route("", web::get().to(get_session))
            .route("", web::delete().to(cancel))
            .route("/disclose/{index}", web::post().to(disclose))
            .route("/summary", web::post().to(show_summary))
            .route("/shipping", web::post().to(open_shipping))
            .route("/shipping", web::delete().to(close_shipping))
            .route("/finish", web::post().to(finish)),
    );
}
