use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde::Serialize;
use serde_json::json;

use crate::error::AppResult;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{InventoryLedger, ShippingService};

/// 管理员校验 + 统一响应包装
async fn admin_action<T, F>(req: &HttpRequest, action: F) -> Result<HttpResponse>
where
    T: Serialize,
    F: std::future::Future<Output = AppResult<T>>,
{
    if let Err(e) = require_admin(req) {
        return Ok(e.error_response());
    }
    match action.await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/document",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "当前内存中的配置（含未保存修改）", body = PrizeDocument),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn get_document(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, async { Ok(ledger.snapshot()) }).await
}

#[utoipa::path(
    put,
    path = "/admin/document",
    tag = "admin",
    request_body = PrizeDocument,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "整份配置已保存", body = PrizeDocument),
        (status = 400, description = "配置不合法"),
        (status = 502, description = "保存失败")
    )
)]
/// 提交整份配置并整体覆盖远端文档
pub async fn put_document(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
    document: web::Json<PrizeDocument>,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.commit(document.into_inner())).await
}

#[utoipa::path(
    post,
    path = "/admin/prizes",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "新增一行奖品", body = Prize),
        (status = 400, description = "已达上限"),
        (status = 409, description = "奖池已锁定")
    )
)]
pub async fn add_prize(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.add_line()).await
}

#[utoipa::path(
    patch,
    path = "/admin/prizes/{rank}",
    tag = "admin",
    params(("rank" = u32, Path, description = "等级")),
    request_body = PrizePatch,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "修改成功；修改数量会重置剩余数量", body = Prize),
        (status = 404, description = "等级不存在"),
        (status = 409, description = "奖池已锁定")
    )
)]
pub async fn update_prize(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
    path: web::Path<u32>,
    patch: web::Json<PrizePatch>,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.update_line(path.into_inner(), patch.into_inner())).await
}

#[utoipa::path(
    delete,
    path = "/admin/prizes/{rank}",
    tag = "admin",
    params(("rank" = u32, Path, description = "等级")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "删除成功，后续等级重新编号", body = Prize),
        (status = 404, description = "等级不存在"),
        (status = 409, description = "奖池已锁定")
    )
)]
pub async fn remove_prize(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
    path: web::Path<u32>,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.remove_line(path.into_inner())).await
}

#[utoipa::path(
    put,
    path = "/admin/settings",
    tag = "admin",
    request_body = SettingsPatch,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "设置已更新（需保存）", body = PrizeDocument),
        (status = 409, description = "锁定期间不能修改展示方式或彩排模式")
    )
)]
pub async fn update_settings(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
    patch: web::Json<SettingsPatch>,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.apply_settings(patch.into_inner())).await
}

#[utoipa::path(
    post,
    path = "/admin/lock",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "切换锁定状态", body = PrizeDocument)
    )
)]
pub async fn toggle_lock(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.toggle_locked()).await
}

#[utoipa::path(
    post,
    path = "/admin/close",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "切换截止状态并立即保存", body = PrizeDocument),
        (status = 502, description = "保存失败")
    )
)]
pub async fn toggle_close(
    ledger: web::Data<InventoryLedger>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, ledger.toggle_closed()).await
}

#[utoipa::path(
    post,
    path = "/admin/save",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "保存当前配置", body = PrizeDocument),
        (status = 400, description = "配置不合法"),
        (status = 502, description = "保存失败")
    )
)]
pub async fn save(ledger: web::Data<InventoryLedger>, req: HttpRequest) -> Result<HttpResponse> {
    admin_action(&req, ledger.save()).await
}

#[utoipa::path(
    post,
    path = "/admin/reload",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "从存储重新加载（丢弃未保存修改）", body = PrizeDocument),
        (status = 502, description = "读取失败")
    )
)]
pub async fn reload(ledger: web::Data<InventoryLedger>, req: HttpRequest) -> Result<HttpResponse> {
    admin_action(&req, ledger.load_initial()).await
}

#[utoipa::path(
    get,
    path = "/admin/shipping",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "配送记录（最新在前）", body = [ShippingRecordResponse])
    )
)]
pub async fn list_shipping(
    service: web::Data<ShippingService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, service.list()).await
}

#[utoipa::path(
    delete,
    path = "/admin/shipping",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "清除全部配送记录，返回删除条数")
    )
)]
pub async fn purge_shipping(
    service: web::Data<ShippingService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_action(&req, service.purge()).await
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/document", web::get().to(get_document))
            .route("/document", web::put().to(put_document))
            .route("/prizes", web::post().to(add_prize))
            .route("/prizes/{rank}", web::patch().to(update_prize))
            .route("/prizes/{rank}", web::delete().to(remove_prize))
            .route("/settings", web::put().to(update_settings))
            .route("/lock", web::post().to(toggle_lock))
            .route("/close", web::post().to(toggle_close))
            .route("/save", web::post().to(save))
            .route("/reload", web::post().to(reload))
            .route("/shipping", web::get().to(list_shipping))
            .route("/shipping", web::delete().to(purge_shipping)),
    );
}
