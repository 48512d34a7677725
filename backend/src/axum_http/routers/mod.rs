pub mod auth;
pub mod checkout;
pub mod payments;
pub mod webhooks;

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;
use crates::domain::value_objects::payments::PaymentOutcome;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const TRUST_COOKIE: &str = "user_email";
const TRUST_COOKIE_DAYS: i64 = 30;

pub fn csrf_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

pub fn trust_cookie(email: String) -> Cookie<'static> {
    Cookie::build((TRUST_COOKIE, email))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::days(TRUST_COOKIE_DAYS))
        .build()
}

pub fn trusted_email(jar: &CookieJar) -> Option<String> {
    jar.get(TRUST_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|email| !email.is_empty())
}

/// 303 to the page the outcome points at. The trust cookie is (re)issued on success.
pub fn outcome_response(jar: CookieJar, outcome: PaymentOutcome) -> Response {
    match outcome {
        PaymentOutcome::Success {
            payment_id,
            trusted_email,
        } => {
            let jar = match trusted_email {
                Some(email) => jar.add(trust_cookie(email)),
                None => jar,
            };
            (jar, Redirect::to(&format!("/success/{payment_id}"))).into_response()
        }
        PaymentOutcome::OtpRequired { payment_id } => {
            (jar, Redirect::to(&format!("/otp/{payment_id}"))).into_response()
        }
    }
}
