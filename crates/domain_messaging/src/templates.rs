//! Email templates

use core_kernel::GopId;

use crate::mail::Email;

/// Sender display name used on every request email
pub const SENDER_NAME: &str = "MediPay";

/// Login details of a freshly provisioned payer account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Payer email for a new, resent or finalised request
pub fn request_email(
    recipient: &str,
    provider_company: &str,
    gop_id: GopId,
    link: &str,
    credentials: Option<&Credentials>,
) -> Email {
    let mut body = format!(
        "<p>Dear Sir/Madam,</p>\
         <p>{provider} has sent you a Guarantee of Payment request (#{id}).</p>\
         <p><a href=\"{link}\">Review the request</a></p>",
        provider = escape(provider_company),
        id = gop_id.value(),
        link = escape(link),
    );

    if let Some(credentials) = credentials {
        body.push_str(&format!(
            "<p>An account has been created for you.<br>\
             Login: {email}<br>Password: {password}</p>\
             <p>Please change your password after signing in.</p>",
            email = escape(&credentials.email),
            password = escape(&credentials.password),
        ));
    }

    body.push_str(&format!("<p>{SENDER_NAME}</p>"));

    Email {
        recipient: recipient.to_string(),
        subject: format!("Request for GOP - {provider_company}"),
        html_body: body,
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
