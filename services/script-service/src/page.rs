use html_escape::{encode_double_quoted_attribute, encode_text};

pub fn loader_snippet(base_url: &str, name: &str) -> String {
    format!(
        "loadstring(game:HttpGet(\"{}/raw/{}\"))()",
        base_url,
        urlencoding::encode(name)
    )
}

/// Page shown to browsers instead of the script: a copyable one-line loader.
pub fn loader_page(base_url: &str, name: &str) -> String {
    let snippet = loader_snippet(base_url, name);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #111; color: #eee; max-width: 48rem; margin: 4rem auto; padding: 0 1rem; }}
textarea {{ width: 100%; font-family: ui-monospace, monospace; background: #1c1c1c; color: #9fe870; border: 1px solid #333; padding: .75rem; }}
button {{ margin-top: .5rem; padding: .5rem 1rem; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>This script is served to executors only. Paste the loader below into your executor.</p>
<textarea id="loader" rows="3" readonly>{snippet_text}</textarea>
<button type="button" data-snippet="{snippet_attr}" onclick="navigator.clipboard.writeText(this.dataset.snippet)">Copy</button>
</body>
</html>
"#,
        title = encode_text(name),
        snippet_text = encode_text(&snippet),
        snippet_attr = encode_double_quoted_attribute(&snippet),
    )
}
