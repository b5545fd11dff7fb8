//! Dashboard page
//!
//! Server-rendered HTML: a sidebar form with the six operating parameters and
//! a main panel with the prediction table, decision banner, bar chart and the
//! feature record preview. Every form change re-submits and re-evaluates.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::fmt::Write;

use crate::{
    api::error::ApiError,
    controller::{AppState, Evaluation},
    domain::{input_specs, DecisionPolicy, ParameterInputs, PredictionSet},
};

const TITLE: &str = "Intelligent HVAC Energy Prediction &amp; Control Dashboard";

/// GET / - Render the dashboard for the submitted (or default) parameters
pub async fn dashboard(
    State(st): State<AppState>,
    query: Result<Query<ParameterInputs>, QueryRejection>,
) -> impl IntoResponse {
    let Query(inputs) = match query {
        Ok(q) => q,
        Err(rejection) => {
            let err = ApiError::BadRequest(rejection.body_text());
            let body = render_failure(&err.public_message());
            return (
                err.status_code(),
                Html(render_page(&ParameterInputs::default(), &body)),
            );
        }
    };

    match st.advisor.evaluate_now(&inputs) {
        Ok(evaluation) => (
            StatusCode::OK,
            Html(render_page(
                &inputs,
                &render_evaluation(&evaluation, st.advisor.policy()),
            )),
        ),
        Err(e) => {
            let err = ApiError::from(e);
            (
                err.status_code(),
                Html(render_page(&inputs, &render_failure(&err.public_message()))),
            )
        }
    }
}

pub fn render_page(inputs: &ParameterInputs, main: &str) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Intelligent HVAC Energy Dashboard</title>
<style>
body {{ margin: 0; font-family: sans-serif; display: flex; }}
aside {{ width: 280px; padding: 20px; background: #f0f2f6; min-height: 100vh; }}
aside label {{ display: block; margin-top: 14px; font-size: 14px; }}
aside input {{ width: 100%; }}
main {{ flex: 1; padding: 20px 40px; }}
table {{ border-collapse: collapse; margin: 10px 0 20px; }}
th, td {{ border: 1px solid #ddd; padding: 6px 12px; text-align: right; }}
th:first-child, td:first-child {{ text-align: left; }}
tr.chosen {{ font-weight: bold; }}
.banner {{ padding: 20px; border-radius: 10px; color: white; }}
.failure {{ padding: 20px; border-radius: 10px; background: #fdecea; color: #611a15; }}
</style>
</head>
<body>
<aside>
<h2>Input Parameters</h2>
<form method="get" action="/">
{form}
<noscript><button type="submit">Update</button></noscript>
</form>
</aside>
<main>
<h1>{TITLE}</h1>
{main}
</main>
</body>
</html>
"#,
        form = render_form(inputs),
    );
    html
}

fn render_form(inputs: &ParameterInputs) -> String {
    let current = serde_json::to_value(inputs).unwrap_or_default();
    let mut form = String::new();
    for spec in input_specs() {
        let value = current[spec.key].as_f64().unwrap_or(spec.default);
        let max = spec
            .max
            .map(|m| format!(r#" max="{m}""#))
            .unwrap_or_default();
        let _ = writeln!(
            form,
            r#"<label for="{key}">{label}</label>
<input type="number" id="{key}" name="{key}" min="{min}"{max} step="{step}" value="{value}" onchange="this.form.submit()">"#,
            key = spec.key,
            label = spec.label,
            min = spec.min,
            step = spec.step,
        );
    }
    form
}

/// Table, banner, chart and record preview, in that order.
pub fn render_evaluation(evaluation: &Evaluation, policy: &DecisionPolicy) -> String {
    let decision = &evaluation.decision;
    let mut out = String::new();

    out.push_str("<h2>Model Prediction Comparison (kWh)</h2>\n");
    out.push_str(&render_prediction_table(
        &evaluation.predictions,
        &decision.model,
    ));

    let _ = write!(
        out,
        r#"<h2>HVAC Control Decision</h2>
<div class="banner" style="background-color:{color};">
<h2>{label}</h2>
<h3>Predicted Load: {kwh:.2} kWh</h3>
<p>Lowest prediction, from {model}</p>
</div>
"#,
        color = decision.color,
        label = escape_html(&decision.label),
        kwh = decision.predicted_kwh,
        model = escape_html(&decision.model),
    );

    out.push_str("<h2>Model Output Bar Chart</h2>\n");
    out.push_str(&bar_chart_svg(&evaluation.predictions, policy));

    out.push_str("<h2>Input Preview (Model receives this)</h2>\n<table>\n<tr>");
    for (name, _) in evaluation.record.named_values() {
        let _ = write!(out, "<th>{name}</th>");
    }
    out.push_str("</tr>\n<tr>");
    for (_, value) in evaluation.record.named_values() {
        let _ = write!(out, "<td>{value}</td>");
    }
    out.push_str("</tr>\n</table>\n");
    let _ = writeln!(
        out,
        "<p><small>Evaluated at {}</small></p>",
        evaluation.evaluated_at.format("%Y-%m-%d %H:%M")
    );
    out
}

fn render_prediction_table(predictions: &PredictionSet, chosen: &str) -> String {
    let mut table =
        String::from("<table>\n<tr><th>Model</th><th>Energy Prediction (Next Hour)</th></tr>\n");
    for (model, kwh) in predictions.iter() {
        let class = if model == chosen { r#" class="chosen""# } else { "" };
        let _ = writeln!(
            table,
            "<tr{class}><td>{}</td><td>{kwh:.2}</td></tr>",
            escape_html(model)
        );
    }
    table.push_str("</table>\n");
    table
}

pub fn render_failure(message: &str) -> String {
    format!(
        "<div class=\"failure\"><h2>Cannot produce a recommendation</h2><p>{}</p></div>\n",
        escape_html(message)
    )
}

/// Vertical bar per model with dashed lines at the two decision thresholds.
pub fn bar_chart_svg(predictions: &PredictionSet, policy: &DecisionPolicy) -> String {
    const WIDTH: f64 = 640.0;
    const HEIGHT: f64 = 280.0;
    const PLOT_TOP: f64 = 20.0;
    const PLOT_BOTTOM: f64 = 240.0;
    const LEFT: f64 = 50.0;

    let peak = predictions
        .maximum()
        .unwrap_or(0.0)
        .max(policy.high_load_kwh)
        .max(1.0)
        * 1.1;
    let y_of = |kwh: f64| PLOT_BOTTOM - (kwh.max(0.0) / peak) * (PLOT_BOTTOM - PLOT_TOP);

    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" role="img">
<line x1="{LEFT}" y1="{PLOT_BOTTOM}" x2="{WIDTH}" y2="{PLOT_BOTTOM}" stroke="#333"/>
"##
    );

    for (threshold, color) in [
        (policy.medium_load_kwh, "orange"),
        (policy.high_load_kwh, "red"),
    ] {
        let y = y_of(threshold);
        let _ = writeln!(
            svg,
            r#"<line x1="{LEFT}" y1="{y:.1}" x2="{WIDTH}" y2="{y:.1}" stroke="{color}" stroke-dasharray="6 4"/><text x="4" y="{ty:.1}" font-size="11">{threshold}</text>"#,
            ty = y + 4.0,
        );
    }

    let slot = (WIDTH - LEFT) / predictions.len().max(1) as f64;
    for (i, (model, kwh)) in predictions.iter().enumerate() {
        let x = LEFT + i as f64 * slot + slot * 0.2;
        let w = slot * 0.6;
        let y = y_of(kwh);
        let _ = writeln!(
            svg,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="#1f77b4"><title>{name}: {kwh:.2} kWh</title></rect><text x="{cx:.1}" y="{ly:.1}" font-size="12" text-anchor="middle">{kwh:.2}</text><text x="{cx:.1}" y="258" font-size="12" text-anchor="middle">{name}</text>"##,
            h = PLOT_BOTTOM - y,
            cx = x + w / 2.0,
            ly = y - 4.0,
            name = escape_html(model),
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
