use crate::EmitError;
use chrono::{TimeZone, Utc};
use lettre::message::{header, Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use shakefollow_config::{EmitterSettings, SmtpCredentials};
use shakefollow_schemas::FinderSolution;
use std::path::Path;

const FOOTER_PLAIN: &str =
    "\n\n--\nDo not reply to this email. This address is not monitored.\nFor assistance, contact your seismic network support group.";
const FOOTER_HTML: &str =
    "<br><hr><p style=\"font-size: 0.9em; color: gray;\">Do not reply to this email. This address is not monitored.<br>For assistance, contact your seismic network support group.</p>";

/// Composes and sends a notification email, optionally attaching the
/// intensity image and/or a run log. Body text is augmented with the event
/// id and, when a solution is available, a summary of its origin.
pub fn send_notification(
    settings: &EmitterSettings,
    credentials: &SmtpCredentials,
    subject: &str,
    body: &str,
    event_id: &str,
    solution: Option<&FinderSolution>,
    attachments: &[&Path],
) -> Result<(), EmitError> {
    let mut plain_body = body.to_string();
    let mut html_body = format!("<html><body><p>{}</p>", body.replace('\n', "<br>"));

    plain_body.push_str(&format!("\nEvent ID: {event_id}"));
    html_body.push_str(&format!("<p><strong>Event ID:</strong> {event_id}</p>"));

    if let Some(solution) = solution {
        let event = &solution.event;
        let origin_time = Utc
            .timestamp_opt(event.origin_time_epoch, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        plain_body.push_str(&format!(
            "\nFollow-up solution summary:\nOrigin Time: {origin_time}\nLatitude: {:.3}\nLongitude: {:.3}\nDepth: {:.1} km\nMagnitude: {:.1}\n",
            event.lat, event.lon, event.depth_km, event.magnitude
        ));
        html_body.push_str(&format!(
            "<p><strong>Follow-up solution summary:</strong><br>Origin Time: {origin_time}<br>Latitude: {:.3}<br>Longitude: {:.3}<br>Depth (km): {:.1}<br>Magnitude: {:.1}</p>",
            event.lat, event.lon, event.depth_km, event.magnitude
        ));
    }

    plain_body.push_str(FOOTER_PLAIN);
    html_body.push_str(FOOTER_HTML);
    html_body.push_str("</body></html>");

    let recipients = settings
        .notification_recipients
        .first()
        .ok_or_else(|| EmitError::Mail("no notification recipients configured".to_string()))?;

    let mut builder = Message::builder()
        .from(credentials.username.parse().map_err(|e| EmitError::Mail(format!("invalid from address: {e}")))?)
        .to(recipients.parse().map_err(|e| EmitError::Mail(format!("invalid to address: {e}")))?)
        .subject(subject);

    for extra in settings.notification_recipients.iter().skip(1) {
        builder = builder.bcc(extra.parse().map_err(|e| EmitError::Mail(format!("invalid bcc address: {e}")))?);
    }

    let mut multipart = MultiPart::mixed().multipart(
        MultiPart::alternative()
            .singlepart(SinglePart::plain(plain_body))
            .singlepart(SinglePart::html(html_body)),
    );

    for path in attachments {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = header::ContentType::parse("application/octet-stream")
            .map_err(|e| EmitError::Mail(e.to_string()))?;
        multipart = multipart.singlepart(Attachment::new(filename).body(bytes, content_type));
    }

    let message = builder.multipart(multipart).map_err(|e| EmitError::Mail(e.to_string()))?;

    let transport = SmtpTransport::starttls_relay(&settings.smtp_host)
        .map_err(|e| EmitError::Mail(e.to_string()))?
        .port(settings.smtp_port)
        .credentials(Credentials::new(credentials.username.clone(), credentials.password.clone()))
        .build();

    transport.send(&message).map_err(|e| EmitError::Mail(e.to_string()))?;
    Ok(())
}
