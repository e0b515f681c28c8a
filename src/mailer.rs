use log::info;

/// Seam for the external "send recovery email" collaborator. Delivery
/// itself is out of scope; the service only needs one capability.
pub trait RecoveryMailer: Send + Sync {
    fn send_recovery_email(&self, destinatario: &str, link: &str);
}

/// Default transport: writes the recovery link to the server log instead
/// of delivering mail. Mailgun credentials live in `Settings` for a real
/// transport to pick up.
pub struct LogMailer;

impl RecoveryMailer for LogMailer {
    fn send_recovery_email(&self, destinatario: &str, link: &str) {
        info!("recovery email for {destinatario}: {link}");
    }
}
