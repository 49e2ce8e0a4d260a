//! Email templates for verification.

/// Content for welcome/verify emails.
pub struct VerificationEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl VerificationEmailContent {
    /// Create verification email content for the given recipient and link.
    pub fn new(name: &str, verify_url: &str) -> Self {
        Self {
            subject: "Verify your Credo account".to_string(),
            text: Self::text_template(name, verify_url),
            html: Self::html_template(name, verify_url),
        }
    }

    fn text_template(name: &str, verify_url: &str) -> String {
        format!(
            r#"Hello {}, welcome to Credo!

Please confirm your email address by opening the link below:

{}

If you didn't create this account, please ignore this email.

--
Credo"#,
            name, verify_url
        )
    }

    fn html_template(name: &str, verify_url: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 40px 20px; }}
        .card {{ background: white; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #1a1a1a; margin-top: 0; font-size: 24px; }}
        .button {{ display: inline-block; padding: 12px 24px; background: #2563eb; color: #fff; border-radius: 6px; text-decoration: none; font-weight: bold; margin: 24px 0; }}
        .footer {{ margin-top: 32px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <h1>Hello {}, welcome to Credo!</h1>
            <p>Please confirm your email address:</p>
            <p><a class="button" href="{}">Verify account</a></p>
            <div class="footer">
                <p>If you didn't create this account, please ignore this email.</p>
            </div>
        </div>
    </div>
</body>
</html>"#,
            name, verify_url
        )
    }
}
