/// Email bodies for the verification and recovery flows.

pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn verify_email(client_url: &str, token: &str, first_name: &str) -> EmailTemplate {
    let verification_url = format!("{}/verify-email/{}", client_url, token);
    EmailTemplate {
        subject: "Verify Your Email - MentWel".to_string(),
        html: format!(
            "<p>Hi {first_name},</p>\
             <p>Thank you for registering with MentWel. Please click \
             <a href=\"{verification_url}\">here</a> to verify your email address.</p>\
             <p>If you didn't create an account with MentWel, please ignore this email.</p>"
        ),
        text: format!(
            "Hi {first_name},\n\nThank you for registering with MentWel. \
             Please verify your email address by visiting:\n\n{verification_url}\n\n\
             If you didn't create an account with MentWel, please ignore this email."
        ),
    }
}

pub fn reset_password(client_url: &str, token: &str, first_name: &str) -> EmailTemplate {
    let reset_url = format!("{}/reset-password?token={}", client_url, token);
    EmailTemplate {
        subject: "Reset Your Password - MentWel".to_string(),
        html: format!(
            "<p>Hi {first_name},</p>\
             <p>We received a request to reset your MentWel password. Click \
             <a href=\"{reset_url}\">here</a> to choose a new one.</p>\
             <p>This link will expire in 10 minutes.</p>\
             <p>If you didn't request a password reset, please ignore this email.</p>"
        ),
        text: format!(
            "Hi {first_name},\n\nWe received a request to reset your MentWel password. \
             Visit the link below to choose a new one:\n\n{reset_url}\n\n\
             This link will expire in 10 minutes.\n\n\
             If you didn't request a password reset, please ignore this email."
        ),
    }
}

pub fn welcome(first_name: &str) -> EmailTemplate {
    EmailTemplate {
        subject: "Welcome to MentWel".to_string(),
        html: format!(
            "<p>Hi {first_name},</p>\
             <p>Your email has been verified successfully! You can now browse our \
             network of therapists and book your first session.</p>"
        ),
        text: format!(
            "Hi {first_name},\n\nYour email has been verified successfully! \
             You can now browse our network of therapists and book your first session."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_embeds_link() {
        let tpl = verify_email("https://app.mentwel.com", "tok-123", "Ada");

        assert!(tpl.html.contains("https://app.mentwel.com/verify-email/tok-123"));
        assert!(tpl.text.contains("https://app.mentwel.com/verify-email/tok-123"));
        assert!(tpl.html.contains("Ada"));
    }

    #[test]
    fn reset_email_embeds_query_token() {
        let tpl = reset_password("https://app.mentwel.com", "tok-456", "Ada");

        assert!(tpl
            .html
            .contains("https://app.mentwel.com/reset-password?token=tok-456"));
    }
}
