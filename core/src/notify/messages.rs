//! Plain-text rendering of the two per-submission messages.

use crate::config::NotificationConfig;
use crate::submission::Submission;

use super::{MessageKind, OutboundMessage};

/// Alert sent to the admin mailbox for every accepted submission.
pub fn admin_alert(submission: &Submission, cfg: &NotificationConfig) -> OutboundMessage {
    let body = format!(
        "New contact form submission\n\
         \n\
         Name: {name}\n\
         Email: {email}\n\
         Phone: {phone}\n\
         Source: {source}\n\
         Submitted: {submitted}\n\
         \n\
         Message:\n\
         {message}\n\
         \n\
         View in admin dashboard: {dashboard}\n",
        name = submission.name,
        email = submission.email,
        phone = submission.phone,
        source = submission.source,
        submitted = submission.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        message = submission.message,
        dashboard = cfg.dashboard_url,
    );

    OutboundMessage {
        kind: MessageKind::AdminAlert,
        submission_id: submission.id.clone(),
        from: cfg.sender.clone(),
        to: cfg.admin_email.clone(),
        subject: format!("New Contact Form Submission - {}", submission.name),
        body,
    }
}

/// Acknowledgement sent to the person who filled in the form.
pub fn welcome(submission: &Submission, cfg: &NotificationConfig) -> OutboundMessage {
    let body = format!(
        "Dear {name},\n\
         \n\
         Thank you for your interest in Scoreazy's Counseling & Mentorship Program! \
         We've received your message and our team will get back to you within 24 hours.\n\
         \n\
         What's next:\n\
         - Our team will review your requirements\n\
         - We'll schedule a personalized discovery call\n\
         - Together we'll build your learning blueprint\n\
         - We'll match you with a mentor\n\
         \n\
         Best regards,\n\
         The Scoreazy Team\n",
        name = submission.name,
    );

    OutboundMessage {
        kind: MessageKind::Welcome,
        submission_id: submission.id.clone(),
        from: cfg.sender.clone(),
        to: submission.email.clone(),
        subject: "Welcome to Scoreazy - We've Received Your Message!".to_string(),
        body,
    }
}
