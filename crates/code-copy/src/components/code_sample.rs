use leptos::prelude::*;

use crate::config::{CODE_BODY_CLASS, CODE_HEADER_CLASS, COPY_BUTTON_CLASS};

/// A titled code sample with a copy button.
///
/// The header sits directly before the highlighted body so the default
/// `.code-block-header + .highlighter-rouge` selector finds it, and the button
/// names the body's id in `data-copy-target` so binding does not depend on
/// button order.
#[component]
pub fn CodeSample(
    /// Element id of the code body, unique on the page
    #[prop(into)]
    id: String,
    /// Caption shown in the header
    #[prop(into)]
    title: String,
    /// The code to show and copy
    #[prop(into)]
    code: String,
    /// Button label
    #[prop(into, default = "Copy".to_string())]
    label: String,
) -> impl IntoView {
    view! {
        <div class=CODE_HEADER_CLASS>
            <span class="code-block-title">{title}</span>
            <button type="button" class=COPY_BUTTON_CLASS data-copy-target=id.clone()>
                {label}
            </button>
        </div>
        <div class=CODE_BODY_CLASS id=id>
            <pre class="highlight"><code>{code}</code></pre>
        </div>
    }
}
