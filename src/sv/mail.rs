//! Outbound email via an HTTP mail service.
//!
//! The transport is a JSON POST to `{EMAIL_SERVICE_URL}/send` with a bearer
//! key. Timeouts and non-2xx responses count as dispatch failures; the
//! caller decides whether that fails the request or is best-effort.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::prelude::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct OutboundEmail<'a> {
  to: &'a str,
  subject: &'a str,
  html: String,
}

struct Http {
  client: Client,
  service_url: String,
  api_key: String,
}

/// Mail dispatcher. Runs disabled (log-only) when no service URL is
/// configured, so local development and tests need no mail backend.
pub struct Mailer {
  http: Option<Http>,
  base_url: String,
}

impl Mailer {
  pub fn new(
    base_url: String,
    service_url: String,
    api_key: String,
  ) -> anyhow::Result<Self> {
    let client = Client::builder()
      .connect_timeout(CONNECT_TIMEOUT)
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    Ok(Self { http: Some(Http { client, service_url, api_key }), base_url })
  }

  pub fn disabled(base_url: String) -> Self {
    Self { http: None, base_url }
  }

  /// Link the recipient clicks to verify, with the email URL-encoded.
  pub fn verification_link(&self, email: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(&format!(
      "{}/api/giveaway/verify",
      self.base_url.trim_end_matches('/')
    ))
    .map_err(|err| Error::Internal(format!("bad base url: {err}")))?;

    url
      .query_pairs_mut()
      .append_pair("token", token)
      .append_pair("email", email);

    Ok(url.into())
  }

  pub async fn send_verification(
    &self,
    email: &str,
    token: &str,
  ) -> Result<()> {
    let link = self.verification_link(email, token)?;

    let html = format!(
      r#"<div style="max-width: 600px; margin: 0 auto; font-family: Arial, sans-serif;">
  <h2>Verify Your Email Address</h2>
  <p>Thank you for registering for our giveaway! Please click the link below to verify your email address:</p>
  <a href="{link}" style="background-color: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block;">Verify Email Address</a>
  <p style="margin-top: 20px;">If the button doesn't work, copy and paste this link into your browser:</p>
  <p style="word-break: break-all;">{link}</p>
  <p style="margin-top: 20px; color: #666;">This link will expire in 24 hours.</p>
</div>"#
    );

    self.send(email, "Verify your email address", html, Some(&link)).await
  }

  /// Post-verification notification with the user's own referral link.
  pub async fn send_welcome(
    &self,
    email: &str,
    referral_code: &str,
  ) -> Result<()> {
    let link = crate::utils::referral_link(&self.base_url, referral_code);

    let html = format!(
      r#"<div style="max-width: 600px; margin: 0 auto; font-family: Arial, sans-serif;">
  <h2>You're in!</h2>
  <p>Your email is verified and you are entered into the giveaway.</p>
  <p>Share your referral link to earn extra entries:</p>
  <p style="word-break: break-all;">{link}</p>
</div>"#
    );

    self.send(email, "You're entered into the giveaway", html, None).await
  }

  async fn send(
    &self,
    to: &str,
    subject: &str,
    html: String,
    link: Option<&str>,
  ) -> Result<()> {
    let Some(http) = &self.http else {
      match link {
        Some(link) => warn!("mail disabled, would send to {to}: {link}"),
        None => warn!("mail disabled, would send to {to}: {subject}"),
      }
      return Ok(());
    };

    let response = http
      .client
      .post(format!("{}/send", http.service_url.trim_end_matches('/')))
      .bearer_auth(&http.api_key)
      .json(&OutboundEmail { to, subject, html })
      .send()
      .await
      .map_err(|err| Error::Mail(format!("request failed: {err}")))?;

    if !response.status().is_success() {
      return Err(Error::Mail(format!(
        "mail service returned {}",
        response.status()
      )));
    }

    debug!("sent \"{subject}\" to {to}");
    Ok(())
  }
}
