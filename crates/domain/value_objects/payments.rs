use uuid::Uuid;

/// Which card the payer submitted. A saved-card reference wins over raw fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CardInput {
    Saved {
        card_id: i32,
    },
    Raw {
        number: String,
        expiry: Option<String>,
        cvv: Option<String>,
        save_card: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPaymentModel {
    pub csrf_cookie: Option<String>,
    pub csrf_form: Option<String>,
    pub idempotency_key: Option<String>,
    pub card: Option<CardInput>,
    pub email: String,
    /// Email from the long-lived trust cookie, if the browser sent one.
    pub trusted_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Show the confirmation page. `trusted_email` is set when the trust cookie should be
    /// (re)issued for that address.
    Success {
        payment_id: Uuid,
        trusted_email: Option<String>,
    },
    OtpRequired {
        payment_id: Uuid,
    },
}
