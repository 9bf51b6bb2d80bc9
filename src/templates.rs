use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

pub const ALERT_EMAIL: &str = "emails/alert_triggered";

const ALERT_EMAIL_TEXT: &str = "Hello {{recipient}},

Your alert for {{symbol}} has triggered.
Target: TZS {{target}}
Current price {{movement}} TZS {{current}}
{{expiry_note}}
{{#if comment}}
Comment: {{comment}}
{{/if}}

This alert is now marked inactive.
";

pub fn build_handlebars() -> Result<Hbs, String> {
    let mut hb = Handlebars::new();

    // plain-text mail bodies
    hb.register_escape_fn(handlebars::no_escape);

    hb.register_template_string(ALERT_EMAIL, ALERT_EMAIL_TEXT)
        .map_err(|e| format!("template {ALERT_EMAIL}: {e}"))?;

    Ok(Arc::new(hb))
}
