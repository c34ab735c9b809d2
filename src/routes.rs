use std::collections::HashMap;

use serde::Serialize;
use worker::{Context, Env, FormEntry, Request, Response, Result, RouteContext, Router};

use crate::error::ApiError;
use crate::models::{
    BATCH_DATE_FIELD, BUILT_HEADER, FAILED_HEADER, FILENAME_QUERY, GROUPS_HEADER,
    InspectResponse, UPLOAD_FILE_FIELD, WARNINGS_HEADER,
};
use crate::split_pipeline::{
    DeploymentOptions, SplitArchive, Upload, content_disposition, inspect_upload,
    parse_deployment_options, split_upload,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub deployment: std::result::Result<DeploymentOptions, String>,
}

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let deployment =
        parse_deployment_options(|name| env.var(name).ok().map(|value| value.to_string()))
            .map_err(|error| error.message().to_string());

    Router::with_data(AppState { deployment })
        .post_async("/api/v1/split", split_route)
        .post_async("/api/v1/inspect", inspect_route)
        .run(req, env)
        .await
}

fn deployment(
    ctx: &RouteContext<AppState>,
) -> std::result::Result<&DeploymentOptions, ApiError> {
    ctx.data.deployment.as_ref().map_err(|message| {
        worker::console_error!("invalid deployment configuration: {message}");
        ApiError::Internal(message.clone())
    })
}

async fn split_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match split_response(&mut req, &ctx).await {
        Ok(response) => Ok(response),
        Err(error) => {
            worker::console_warn!("split request failed: {error}");
            error.into_response()
        }
    }
}

async fn inspect_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match inspect_response(&mut req, &ctx).await {
        Ok(response) => json_response(&response),
        Err(error) => {
            worker::console_warn!("inspect request failed: {error}");
            error.into_response()
        }
    }
}

async fn inspect_response(
    req: &mut Request,
    ctx: &RouteContext<AppState>,
) -> std::result::Result<InspectResponse, ApiError> {
    let deployment = deployment(ctx)?;
    let upload = read_upload(req).await?;
    inspect_upload(&upload, deployment)
}

async fn split_response(
    req: &mut Request,
    ctx: &RouteContext<AppState>,
) -> std::result::Result<Response, ApiError> {
    let deployment = deployment(ctx)?;
    let upload = read_upload(req).await?;
    let archive = split_upload(&upload, deployment)?;

    worker::console_log!(
        "split completed: strategy={}, groups={}, built={}, warnings={}",
        archive.strategy,
        archive.group_count,
        archive.built_count,
        archive.warnings.len()
    );
    for warning in &archive.warnings {
        worker::console_warn!("split warning {}: {}", warning.code, warning.message);
    }

    archive_response(archive)
}

fn archive_response(archive: SplitArchive) -> std::result::Result<Response, ApiError> {
    let mut response = Response::from_bytes(archive.bytes)?;
    let headers = response.headers_mut();
    headers.set("Content-Type", "application/zip")?;
    headers.set("Content-Disposition", &content_disposition(&archive.file_name))?;
    headers.set(GROUPS_HEADER, &archive.group_count.to_string())?;
    headers.set(BUILT_HEADER, &archive.built_count.to_string())?;
    headers.set(WARNINGS_HEADER, &archive.warnings.len().to_string())?;
    if !archive.failed.is_empty() {
        headers.set(FAILED_HEADER, &archive.failed.join(","))?;
    }
    headers.set("Cache-Control", "no-store")?;
    Ok(response)
}

fn json_response<T>(payload: &T) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

fn parse_query(req: &Request) -> std::result::Result<HashMap<String, String>, ApiError> {
    let url = req.url()?;
    let query = url
        .query_pairs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    Ok(query)
}

pub fn is_multipart(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| {
        value
            .trim()
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
    })
}

/// Reads the PDF either from a multipart `file` field or from the raw body.
async fn read_upload(req: &mut Request) -> std::result::Result<Upload, ApiError> {
    let content_type = req.headers().get("Content-Type")?;
    if is_multipart(content_type.as_deref()) {
        return read_multipart_upload(req).await;
    }

    let query = parse_query(req)?;
    Ok(Upload {
        bytes: req.bytes().await?,
        file_name: query.get(FILENAME_QUERY).cloned(),
        batch_date: query.get(BATCH_DATE_FIELD).cloned(),
    })
}

async fn read_multipart_upload(req: &mut Request) -> std::result::Result<Upload, ApiError> {
    let form = req.form_data().await?;

    let Some(FormEntry::File(file)) = form.get(UPLOAD_FILE_FIELD) else {
        return Err(ApiError::BadRequest(format!(
            "multipart upload needs a '{UPLOAD_FILE_FIELD}' file field"
        )));
    };
    let batch_date = match form.get(BATCH_DATE_FIELD) {
        Some(FormEntry::Field(value)) => Some(value),
        _ => None,
    };

    Ok(Upload {
        bytes: file.bytes().await?,
        file_name: Some(file.name()),
        batch_date,
    })
}
