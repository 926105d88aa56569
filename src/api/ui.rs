//! UI routes: the receipt review page and its static assets

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use crate::AppState;

// Embed static files at compile time
const REVIEW_JS: &str = include_str!("../../static/review.js");

/// GET /
///
/// Single-page review UI: upload a receipt, review the extracted items,
/// submit the kept ones to the fridge tracker.
pub async fn root_page() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("GIT_HASH");
    let build_timestamp = env!("BUILD_TIMESTAMP");
    let build_profile = env!("BUILD_PROFILE");

    let html = format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Fridge Receipt Import</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background: #1a1a1a;
            color: #e0e0e0;
        }}
        header {{
            background-color: #2a2a2a;
            border-bottom: 1px solid #3a3a3a;
            padding: 20px;
            margin-bottom: 30px;
        }}
        .header-content {{
            display: flex;
            justify-content: space-between;
            align-items: center;
        }}
        .header-right {{
            text-align: right;
            font-size: 14px;
            color: #888;
            font-family: 'Courier New', monospace;
            line-height: 1.2;
        }}
        .build-info-line {{
            margin-bottom: 1px;
        }}
        h1 {{
            font-size: 26px;
            margin-bottom: 5px;
            color: #4a9eff;
        }}
        h2 {{
            color: #4a9eff;
            margin-bottom: 10px;
        }}
        .subtitle {{
            color: #888;
            font-size: 16px;
        }}
        .content {{
            padding: 0 20px 40px;
            max-width: 1000px;
            margin: 0 auto;
        }}
        .card {{
            background: #2a2a2a;
            padding: 20px;
            border-radius: 8px;
            margin: 20px 0;
            border: 1px solid #3a3a3a;
            box-shadow: 0 2px 4px rgba(0,0,0,0.3);
        }}
        .form-group {{
            margin: 15px 0;
        }}
        .form-group label {{
            display: block;
            font-weight: bold;
            margin-bottom: 5px;
            color: #e0e0e0;
        }}
        .form-group input, .form-group select {{
            width: 100%;
            padding: 8px;
            border: 1px solid #3a3a3a;
            border-radius: 4px;
            font-size: 14px;
            background: #333;
            color: #e0e0e0;
        }}
        .button {{
            display: inline-block;
            padding: 10px 20px;
            background: #4a9eff;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 16px;
            font-weight: 600;
        }}
        .button:hover {{
            background: #3a8eef;
        }}
        .button:disabled {{
            background: #666;
            cursor: not-allowed;
        }}
        .button.secondary {{
            background: #3a3a3a;
            color: #e0e0e0;
        }}
        .button.secondary:hover {{
            background: #4a4a4a;
        }}
        .actions {{
            display: flex;
            gap: 10px;
            margin-top: 20px;
            flex-wrap: wrap;
        }}
        .error {{
            background: rgba(220, 38, 38, 0.2);
            color: #ff6b6b;
            padding: 10px;
            border-radius: 4px;
            border: 1px solid #dc2626;
            margin: 10px 0;
        }}
        .banner-success {{
            background: rgba(74, 222, 128, 0.2);
            color: #4ade80;
            padding: 12px;
            border-radius: 4px;
            border: 1px solid #4ade80;
            margin: 10px 0;
        }}
        .banner-warn {{
            background: rgba(255, 152, 0, 0.2);
            color: #ff9800;
            padding: 12px;
            border-radius: 4px;
            border: 1px solid #ff9800;
            margin: 10px 0;
        }}
        .caption {{
            color: #888;
            font-size: 14px;
            margin-bottom: 15px;
        }}
        .item-card {{
            padding: 12px;
            margin: 8px 0;
            border-left: 4px solid #4a9eff;
            background: #333;
            border-radius: 4px;
        }}
        .item-card.excluded {{
            border-left-color: #666;
            opacity: 0.6;
        }}
        .item-fields {{
            display: grid;
            grid-template-columns: 2fr 1.2fr 0.8fr 2fr;
            gap: 10px;
        }}
        .item-fields label {{
            display: block;
            font-size: 12px;
            color: #888;
            margin-bottom: 3px;
        }}
        .item-fields input {{
            width: 100%;
            padding: 6px;
            border: 1px solid #3a3a3a;
            border-radius: 4px;
            background: #2a2a2a;
            color: #e0e0e0;
            font-size: 14px;
        }}
        .include-row {{
            margin-top: 8px;
            font-size: 14px;
        }}
        .include-row input {{
            margin-right: 6px;
        }}
        @media (max-width: 768px) {{
            .item-fields {{
                grid-template-columns: 1fr 1fr;
            }}
        }}
    </style>
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>Fridge Receipt Import</h1>
                <p class="subtitle">Upload a grocery receipt PDF and file the perishables into the fridge tracker</p>
            </div>
            <div class="header-right">
                <div class="build-info-line">v{0}</div>
                <div class="build-info-line">{1} ({2})</div>
                <div class="build-info-line">{3}</div>
            </div>
        </div>
    </header>
    <div class="content">
        <div id="status-banner"></div>

        <div class="card" id="upload">
            <h2>Upload Receipt</h2>
            <div class="form-group">
                <label for="receipt-file">Receipt PDF:</label>
                <input type="file" id="receipt-file" accept="application/pdf">
            </div>
            <div class="form-group">
                <label for="submitter">Who went shopping?</label>
                <select id="submitter"></select>
            </div>
            <button class="button" id="parse-btn">Parse Receipt</button>
            <div id="upload-error" class="error" style="display: none;"></div>
        </div>

        <div class="card" id="review" style="display: none;">
            <h2 id="review-heading">Review Items</h2>
            <p class="caption">Adjust anything that looks wrong. Untick items you don't want tracked.</p>
            <div id="items-container"></div>
            <div class="actions">
                <button class="button" id="submit-btn">Add to Fridge Tracker</button>
                <button class="button secondary" id="reparse-btn">Re-parse Receipt</button>
                <button class="button secondary" id="discard-btn">Start Over</button>
            </div>
            <div id="review-error" class="error" style="display: none;"></div>
        </div>
    </div>
    <script src="/static/review.js"></script>
</body>
</html>
        "#,
        version, git_hash, build_profile, build_timestamp
    );

    Html(html)
}

/// GET /static/review.js
///
/// Serves the review page JavaScript
pub async fn serve_review_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        REVIEW_JS,
    )
        .into_response()
}

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/static/review.js", get(serve_review_js))
}
