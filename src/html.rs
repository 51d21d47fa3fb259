//! HTML timeline generator
//!
//! Renders a standalone page with one SVG bar per request. Slide states are
//! embedded as a name -> scale table; `setState(name)` (or a `postMessage`
//! of `{ "state": name }` from the hosting deck) applies the state's zoom
//! and highlights.

use crate::config::TimelineConfig;
use crate::error::{Error, Result};
use crate::slides::StateView;
use chrono::Utc;
use har_timeline_core::fit::{extent, Scale};
use har_timeline_core::{RequestRecord, Timeline};
use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// HTML template for the timeline page
const TIMELINE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <style>
        :root {
            --bg-primary: #0d1117;
            --bg-secondary: #161b22;
            --text-primary: #c9d1d9;
            --text-muted: #6e7681;
            --border-color: #30363d;
            --accent-blue: #58a6ff;
            --accent-green: #3fb950;
            --accent-red: #f85149;
            --accent-purple: #a371f7;
            --accent-orange: #d29922;
        }

        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
        }

        header {
            padding: 1rem 1.5rem;
            border-bottom: 1px solid var(--border-color);
            display: flex;
            justify-content: space-between;
            align-items: baseline;
        }

        .stats {
            color: var(--text-muted);
            font-size: 0.9rem;
        }

        .chart {
            padding: 1rem 1.5rem;
            overflow: hidden;
        }

        .chart svg {
            background: var(--bg-secondary);
            border: 1px solid var(--border-color);
            border-radius: 8px;
        }

        #bars {
            transition: transform 0.6s ease-in-out;
        }

        rect.bar { fill: var(--text-muted); transition: opacity 0.4s; }
        rect.kind-image { fill: var(--accent-purple); }
        rect.kind-script { fill: var(--accent-orange); }
        rect.kind-style { fill: var(--accent-blue); }
        rect.kind-font { fill: var(--accent-green); }

        line.milestone { stroke-width: 1; stroke-dasharray: 4 3; }
        line.on-load { stroke: var(--accent-red); }
        line.on-content-load { stroke: var(--accent-blue); }

        svg.highlighting rect.bar { opacity: 0.25; }
        {% for tag in tags %}
        svg.hl-{{ tag.class }} rect.tag-{{ tag.class }} { opacity: 1; }
        {% endfor %}

        footer {
            padding: 1rem 1.5rem;
            color: var(--text-muted);
            font-size: 0.8rem;
        }
    </style>
</head>
<body>
    <header>
        <h1>{{ title }}</h1>
        <span class="stats">{{ record_count }} requests &middot; onLoad {{ on_load }} ms</span>
    </header>

    <div class="chart">
        {% if bars %}
        <svg id="timeline" width="{{ width }}" height="{{ height }}" viewBox="0 0 {{ width }} {{ height }}">
            <g id="bars">
                {% for bar in bars %}
                <rect class="{{ bar.classes }}" data-index="{{ loop.index0 }}"
                      x="{{ bar.x }}" y="{{ bar.y }}" width="{{ bar.width }}" height="{{ bar.height }}">
                    <title>{{ bar.tooltip }}</title>
                </rect>
                {% endfor %}
                {% if on_content_load_x %}
                <line class="milestone on-content-load" x1="{{ on_content_load_x }}" x2="{{ on_content_load_x }}" y1="0" y2="{{ height }}"></line>
                {% endif %}
                <line class="milestone on-load" x1="{{ on_load_x }}" x2="{{ on_load_x }}" y1="0" y2="{{ height }}"></line>
            </g>
        </svg>
        {% else %}
        <p>No requests before onLoad.</p>
        {% endif %}
    </div>

    <footer>
        <p>Generated {{ generated_at }}</p>
    </footer>

    <script>
        window.TIMELINE_STATES = {{ states_json | safe }};

        function setState(name) {
            const svg = document.getElementById('timeline');
            const bars = document.getElementById('bars');
            if (!svg || !bars) return;

            const state = window.TIMELINE_STATES[name];
            const scale = state ? state.scale : { x: 1, y: 1 };
            bars.style.transform = 'scale(' + scale.x + ', ' + scale.y + ')';
            bars.style.transformOrigin = '0 0';

            svg.setAttribute('class', '');
            if (state && state.highlight.length > 0) {
                svg.classList.add('highlighting');
                state.highlight.forEach(cls => svg.classList.add('hl-' + cls));
            }
        }

        window.addEventListener('message', function(event) {
            if (event.data && typeof event.data.state === 'string') {
                setState(event.data.state);
            }
        });
    </script>
</body>
</html>
"#;

/// Bar data for template rendering
#[derive(Debug, Clone, Serialize)]
struct BarData {
    x: String,
    y: String,
    width: String,
    height: String,
    classes: String,
    tooltip: String,
}

/// Tag data for template rendering
#[derive(Debug, Clone, Serialize)]
struct TagData {
    class: String,
}

/// Slide state as embedded in the page; `highlight` holds CSS class names
#[derive(Debug, Clone, Serialize)]
struct StateData<'a> {
    name: &'a str,
    scale: Scale,
    highlight: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a StateView> for StateData<'a> {
    fn from(view: &'a StateView) -> Self {
        Self {
            name: &view.name,
            scale: view.scale,
            highlight: view.highlight.iter().map(|t| css_class(t)).collect(),
            error: view.error.as_deref(),
        }
    }
}

/// Make a name safe to use inside a CSS class
fn css_class(name: &str) -> String {
    name.replace(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'), "-")
}

fn bar_data(position: usize, record: &RequestRecord, config: &TimelineConfig) -> BarData {
    let mut classes = vec!["bar".to_string(), format!("kind-{}", record.kind)];
    classes.extend(record.active_tags().map(|t| format!("tag-{}", css_class(t))));

    let tooltip = format!(
        "{}\n{}\nstart {:.0} ms, {:.0} ms",
        record.full_url,
        if record.mime_type.is_empty() {
            "(no MIME type)"
        } else {
            &record.mime_type
        },
        record.start,
        record.duration
    );

    BarData {
        x: format!("{:.2}", record.start * config.pixels_per_ms),
        y: format!("{:.2}", config.layout.row_top(position)),
        width: format!("{:.2}", (record.duration * config.pixels_per_ms).max(1.0)),
        height: format!("{:.2}", config.layout.item_height),
        classes: classes.join(" "),
        tooltip,
    }
}

/// JSON for an inline `<script>`; `</` would end the script element early
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Generate the HTML timeline
pub fn generate_timeline(
    timeline: &Timeline,
    config: &TimelineConfig,
    states: &[StateView],
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("timeline.html", TIMELINE_TEMPLATE)?;

    let template = env.get_template("timeline.html")?;

    let bars: Vec<BarData> = timeline
        .records
        .iter()
        .enumerate()
        .map(|(position, record)| bar_data(position, record, config))
        .collect();

    let tags: Vec<TagData> = config
        .tags
        .keys()
        .map(|name| TagData {
            class: css_class(name),
        })
        .collect();

    // The fitter's full extent; milestones past it are clipped
    let canvas = extent(&timeline.records, &config.layout);
    let width = (canvas.x * config.pixels_per_ms).max(1.0);
    let height = canvas.y + config.layout.item_height;

    let states_json = script_json(
        &states
            .iter()
            .map(|s| (s.name.as_str(), StateData::from(s)))
            .collect::<BTreeMap<_, _>>(),
    )?;

    let html = template.render(context! {
        title => timeline.page_title.as_deref().unwrap_or(&config.title),
        record_count => timeline.len(),
        on_load => format!("{:.0}", timeline.on_load),
        on_load_x => format!("{:.2}", timeline.on_load * config.pixels_per_ms),
        on_content_load_x => timeline.on_content_load.map(|v| format!("{:.2}", v * config.pixels_per_ms)),
        width => format!("{:.2}", width),
        height => format!("{:.2}", height),
        bars => bars,
        tags => tags,
        states_json => states_json,
        generated_at => Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    })?;

    Ok(html)
}

/// Write `index.html` and `records.json` into `output_dir`
pub fn write_timeline(
    timeline: &Timeline,
    config: &TimelineConfig,
    states: &[StateView],
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::FileWriteError {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let html = generate_timeline(timeline, config, states)?;
    let index_path = output_dir.join("index.html");
    std::fs::write(&index_path, html).map_err(|e| Error::FileWriteError {
        path: index_path.display().to_string(),
        source: e,
    })?;

    let data_path = output_dir.join("records.json");
    let json = serde_json::to_string_pretty(timeline)?;
    std::fs::write(&data_path, json).map_err(|e| Error::FileWriteError {
        path: data_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
