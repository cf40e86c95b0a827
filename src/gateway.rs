use crate::config::Config;
use crate::presenter::{self, DetectionView};
use crate::types::{DetectionResult, UploadedFile};
use bytes::{Buf, Bytes};
use failure::Fail;
use futures::StreamExt;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use url::Url;
use warp::filters::multipart::FormData;
use warp::http::header::CONTENT_TYPE;
use warp::http::{HeaderValue, StatusCode};
use warp::{Filter, Rejection, Reply};

const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Everything a single upload needs: the shared HTTP client (which carries
/// the outbound timeout) and the resolved detection endpoint.
#[derive(Clone)]
pub struct Context {
    client: reqwest::Client,
    detect_url: Url,
}

#[derive(Debug, Fail)]
pub enum GatewayError {
    #[fail(display = "{}", _0)]
    Validation(String),
    #[fail(display = "{}", message)]
    Backend { status: StatusCode, message: String },
    #[fail(display = "Failed to process image")]
    Internal(failure::Error),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Backend { status, .. } => *status,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the `{ "error": ... }` envelope. Internal
    /// causes stay in the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Validation(message) => message.clone(),
            GatewayError::Backend { message, .. } => message.clone(),
            GatewayError::Internal(_) => "Failed to process image".to_string(),
        }
    }

    fn to_reply(&self) -> warp::reply::Response {
        warp::reply::with_status(
            warp::reply::json(&ErrorBody {
                error: self.public_message(),
            }),
            self.status(),
        )
        .into_response()
    }
}

impl From<warp::Error> for GatewayError {
    fn from(e: warp::Error) -> GatewayError {
        GatewayError::Internal(e.into())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> GatewayError {
        GatewayError::Internal(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct BackendOutcome {
    /// The backend's body bytes, passed through verbatim on the JSON route.
    body: Bytes,
    result: DetectionResult,
}

pub async fn run(config: Config) {
    let client = reqwest::Client::builder()
        .timeout(config.backend_timeout)
        .build()
        .expect("Unable to build HTTP client");
    let ctx = Context {
        client,
        detect_url: config.detect_url,
    };
    info!("Listening on port {}", config.port);
    warp::serve(routes(ctx)).run(([0, 0, 0, 0], config.port)).await;
}

pub fn routes(
    ctx: Context,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    // Path filters come first so an unknown path rejects as not-found and a
    // bad content type on a matched path outranks method rejections.
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(presenter::render_page(&DetectionView::Empty, None)));
    let api = warp::path!("api" / "upload")
        .and(warp::post())
        .and(warp::filters::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_context(ctx.clone()))
        .and_then(handle_api_upload);
    let page = warp::path!("upload")
        .and(warp::post())
        .and(warp::filters::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_context(ctx))
        .and_then(handle_page_upload);
    index.or(api).or(page).recover(handle_rejection)
}

fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// JSON contract: errors become `{ "error": ... }`, success passes the
/// backend body through unchanged at 200.
async fn handle_api_upload(form: FormData, ctx: Context) -> Result<impl warp::Reply, Infallible> {
    Ok(match process_upload(form, &ctx).await {
        Ok(outcome) => {
            let mut response = warp::reply::Response::new(outcome.body.into());
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            log_error(&e);
            e.to_reply()
        }
    })
}

/// Server-rendered variant of the same pipeline for the plain HTML form.
async fn handle_page_upload(form: FormData, ctx: Context) -> Result<impl warp::Reply, Infallible> {
    Ok(match process_upload(form, &ctx).await {
        Ok(outcome) => {
            let view = DetectionView::from_result(Some(&outcome.result));
            warp::reply::html(presenter::render_page(&view, None)).into_response()
        }
        Err(e) => {
            log_error(&e);
            let html = presenter::render_page(&DetectionView::Empty, Some(&e.public_message()));
            warp::reply::with_status(warp::reply::html(html), e.status()).into_response()
        }
    })
}

fn log_error(e: &GatewayError) {
    match e {
        GatewayError::Validation(message) => debug!("Rejected upload: {}", message),
        GatewayError::Backend { status, message } => {
            warn!("Backend rejected upload ({}): {}", status, message)
        }
        GatewayError::Internal(cause) => error!("Error processing upload: {:?}", cause),
    }
}

async fn process_upload(mut form: FormData, ctx: &Context) -> Result<BackendOutcome, GatewayError> {
    let file = match read_upload(&mut form).await? {
        Some(file) if !file.data.is_empty() => file,
        _ => return Err(GatewayError::Validation("No file uploaded".to_string())),
    };
    if !file.is_image() {
        return Err(GatewayError::Validation(
            "Uploaded file is not an image".to_string(),
        ));
    }

    let mut part = reqwest::multipart::Part::bytes(file.data);
    if let Some(filename) = file.filename {
        part = part.file_name(filename);
    }
    if let Some(content_type) = file.content_type {
        part = part.mime_str(&content_type)?;
    }
    let outbound = reqwest::multipart::Form::new().part("file", part);

    let response = ctx
        .client
        .post(ctx.detect_url.clone())
        .multipart(outbound)
        .send()
        .await?;
    let status = response.status();
    let body = response.bytes().await?;
    let result = normalize_backend_response(status, &body)?;
    Ok(BackendOutcome { body, result })
}

/// Collects the `file` field from the form; other fields are ignored.
async fn read_upload(form: &mut FormData) -> Result<Option<UploadedFile>, GatewayError> {
    let mut file = None;
    while let Some(part) = form.next().await {
        let part = part?;
        debug!("Got part {}", part.name());
        match part.name() {
            "file" => {
                let content_type = part.content_type().map(str::to_string);
                let filename = part.filename().map(str::to_string);
                let mut data: Vec<u8> = vec![];
                let mut stream = part.stream();
                while let Some(buf) = stream.next().await {
                    data.extend_from_slice(buf?.bytes());
                }
                file = Some(UploadedFile {
                    data,
                    content_type,
                    filename,
                });
            }
            _ => {
                warn!("Ignoring part {}", part.name());
            }
        }
    }
    Ok(file)
}

/// Maps the backend's (status, body) onto the error taxonomy. Non-2xx keeps
/// the backend's status and its `detail` message when one is present; a 2xx
/// body must deserialize as a `DetectionResult` before it is trusted.
fn normalize_backend_response(
    status: StatusCode,
    body: &[u8],
) -> Result<DetectionResult, GatewayError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v["detail"].as_str().map(str::to_string))
            .unwrap_or_else(|| "Backend processing failed".to_string());
        return Err(GatewayError::Backend { status, message });
    }
    serde_json::from_slice::<DetectionResult>(body).map_err(|e| {
        GatewayError::Internal(format_err!("Backend returned an unexpected body: {}", e))
    })
}

async fn handle_rejection(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Uploaded file is too large")
    } else if err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (
            StatusCode::BAD_REQUEST,
            "Request must be a multipart form upload",
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to process image")
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: message.to_string(),
        }),
        status,
    ))
}
