use super::{Address, Email, MailError};
use crate::auth::{KIND_RESET_PASSWORD, KIND_VERIFY_EMAIL, TokenSigner};

const APP_NAME: &str = "Pathfork App";

/// Builds the account verification message for a new user.
pub fn verification_email(
    signer: &TokenSigner,
    base_url: &str,
    site_inbox: &str,
    recipient: &str,
) -> Result<Email, MailError> {
    let token = signer
        .sign(recipient, KIND_VERIFY_EMAIL)
        .map_err(|e| MailError::Message(e.to_string()))?;
    let link = format!("{}/auth?action=verify&token={}", base_url.trim_end_matches('/'), token);

    Ok(Email {
        from: Address::new(APP_NAME, site_inbox),
        to: Address::new("New Pathfork user", recipient),
        subject: "Please verify your new account with Pathfork".to_string(),
        body: format!(
            "Please follow this link to verify your email address and activate your account: {link}"
        ),
    })
}

/// Builds the password reset message. The embedded token is timestamped.
pub fn reset_password_email(
    signer: &TokenSigner,
    base_url: &str,
    site_inbox: &str,
    recipient: &str,
    valid_minutes: u64,
) -> Result<Email, MailError> {
    let token = signer
        .sign_timestamped(recipient, KIND_RESET_PASSWORD)
        .map_err(|e| MailError::Message(e.to_string()))?;
    let link = format!("{}/reset?action=reset&token={}", base_url.trim_end_matches('/'), token);

    Ok(Email {
        from: Address::new(APP_NAME, site_inbox),
        to: Address::new("Pathfork user", recipient),
        subject: "Here's the link to reset your Pathfork password".to_string(),
        body: format!(
            "Please follow this link to reset your password (this link will expire in {} hours): {link}",
            valid_minutes / 60
        ),
    })
}

/// Forwards a contact form submission to the site inbox.
pub fn contact_email(site_inbox: &str, sender: &str, message: &str) -> Email {
    Email {
        from: Address::new("Pathfork user", sender),
        to: Address::new("Pathfork app", site_inbox),
        subject: "New contact form submission from Pathfork".to_string(),
        body: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"mail-test-secret-mail-test-secret-1")
    }

    fn token_from(body: &str) -> &str {
        body.rsplit("token=").next().unwrap()
    }

    #[test]
    fn verification_link_carries_verify_token() {
        let signer = signer();
        let email =
            verification_email(&signer, "http://localhost:8080/", "app@example.com", "a@b.com")
                .unwrap();

        assert_eq!(email.to.email, "a@b.com");
        assert!(email.body.contains("http://localhost:8080/auth?action=verify&token="));
        assert_eq!(
            signer.verify(KIND_VERIFY_EMAIL, token_from(&email.body)).unwrap(),
            "a@b.com"
        );
    }

    #[test]
    fn reset_link_is_timestamped() {
        let signer = signer();
        let email =
            reset_password_email(&signer, "https://pathfork.test", "app@example.com", "a@b.com", 4320)
                .unwrap();

        assert!(email.body.contains("expire in 72 hours"));
        let token = token_from(&email.body);
        assert_eq!(
            signer.verify_timestamped(KIND_RESET_PASSWORD, token, 4320).unwrap(),
            "a@b.com"
        );
    }

    #[test]
    fn contact_goes_to_site_inbox() {
        let email = contact_email("app@example.com", "fan@example.com", "Love it");

        assert_eq!(email.to.email, "app@example.com");
        assert_eq!(email.from.email, "fan@example.com");
        assert_eq!(email.body, "Love it");
    }
}
