// libs/notification-cell/src/services/reminder.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::relation::embedded_str;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{EmailMessage, NotificationError};
use crate::services::mailer::MailerClient;

/// How far ahead of "now" an encounter must start to get its reminder.
fn lookahead() -> Duration {
    Duration::hours(1)
}

/// Periodic sweeps over near-due encounters. Delivery is at-least-once: the
/// reminder flag is written only after a successful send, so a failed send
/// is retried on the next pass, and a failed flag write after a successful
/// send can produce a duplicate email. A failure on one item never stops
/// the pass.
pub struct ReminderScannerService {
    supabase: Arc<SupabaseClient>,
    mailer: MailerClient,
    appointment_interval: StdDuration,
    home_visit_interval: StdDuration,
}

impl ReminderScannerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            mailer: MailerClient::new(config),
            appointment_interval: StdDuration::from_secs(config.appointment_reminder_interval_secs),
            home_visit_interval: StdDuration::from_secs(config.home_visit_reminder_interval_secs),
        }
    }

    /// Starts both sweep loops. They run until process shutdown; neither
    /// surfaces errors anywhere but the log.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting reminder sweeps (appointments every {:?}, home visits every {:?})",
              self.appointment_interval, self.home_visit_interval);

        let appointment_scanner = Arc::clone(&self);
        let appointment_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(appointment_scanner.appointment_interval);
            loop {
                ticker.tick().await;
                match appointment_scanner.scan_appointments(Utc::now()).await {
                    Ok(sent) if sent > 0 => info!("Appointment sweep sent {} reminder(s)", sent),
                    Ok(_) => debug!("Appointment sweep found nothing due"),
                    Err(e) => error!("Appointment reminder sweep failed: {}", e),
                }
            }
        });

        let home_visit_scanner = self;
        let home_visit_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(home_visit_scanner.home_visit_interval);
            loop {
                ticker.tick().await;
                match home_visit_scanner.scan_home_visits(Utc::now()).await {
                    Ok(sent) if sent > 0 => info!("Home visit sweep sent {} reminder(s)", sent),
                    Ok(_) => debug!("Home visit sweep found nothing due"),
                    Err(e) => error!("Home visit reminder sweep failed: {}", e),
                }
            }
        });

        vec![appointment_handle, home_visit_handle]
    }

    /// One pass over appointments starting within the lookahead window.
    /// Returns how many reminders went out.
    pub async fn scan_appointments(&self, now: DateTime<Utc>) -> Result<u32, NotificationError> {
        let window_end = now + lookahead();
        debug!("Scanning appointments due between {} and {}", now, window_end);

        let path = format!(
            "/rest/v1/appointments?reminder_sent=eq.false&status=eq.scheduled\
             &appointment_date=gte.{}&appointment_date=lte.{}\
             &select=*,patients(email,first_name),doctors(first_name,last_name)",
            now.date_naive(),
            window_end.date_naive(),
        );

        let rows: Vec<Value> = self.supabase.service_request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let mut sent = 0;
        for row in &rows {
            let Some(id) = row.get("id").and_then(Value::as_i64) else {
                warn!("Skipping appointment row without an id");
                continue;
            };

            let Some(start) = scheduled_start(row, "appointment_date", "appointment_time") else {
                warn!("Skipping appointment {} with unparsable schedule", id);
                continue;
            };
            if start < now || start > window_end {
                continue;
            }

            let Some(email) = embedded_str(row, "patients", "email") else {
                debug!("Appointment {}: patient has no registered email, skipping", id);
                continue;
            };

            let patient_name = embedded_str(row, "patients", "first_name").unwrap_or("there");
            let doctor_name = match (
                embedded_str(row, "doctors", "first_name"),
                embedded_str(row, "doctors", "last_name"),
            ) {
                (Some(first), Some(last)) => format!("Dr. {} {}", first, last),
                _ => "your doctor".to_string(),
            };

            let message = EmailMessage {
                to: email.to_string(),
                subject: "Appointment reminder".to_string(),
                html: format!(
                    "<p>Hi {},</p><p>This is a reminder that your appointment with {} \
                     starts at {}.</p>",
                    patient_name,
                    doctor_name,
                    start.format("%H:%M on %d %b %Y"),
                ),
            };

            if let Err(e) = self.mailer.send(&message).await {
                // Flag stays false; the next sweep retries this item
                warn!("Appointment {} reminder failed, will retry: {}", id, e);
                continue;
            }

            sent += 1;

            if let Err(e) = self.mark_reminded("appointments", id).await {
                warn!("Appointment {} reminder sent but flag write failed (duplicate possible): {}", id, e);
            }
        }

        Ok(sent)
    }

    /// One pass over home visits starting within the lookahead window.
    pub async fn scan_home_visits(&self, now: DateTime<Utc>) -> Result<u32, NotificationError> {
        let window_end = now + lookahead();
        debug!("Scanning home visits due between {} and {}", now, window_end);

        let path = format!(
            "/rest/v1/home_visits?reminder_sent=eq.false\
             &visit_date=gte.{}&visit_date=lte.{}\
             &select=*,patients(email,first_name)",
            now.date_naive(),
            window_end.date_naive(),
        );

        let rows: Vec<Value> = self.supabase.service_request(Method::GET, &path, None)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let mut sent = 0;
        for row in &rows {
            let Some(id) = row.get("id").and_then(Value::as_i64) else {
                warn!("Skipping home visit row without an id");
                continue;
            };

            let Some(start) = scheduled_start(row, "visit_date", "visit_time") else {
                warn!("Skipping home visit {} with unparsable schedule", id);
                continue;
            };
            if start < now || start > window_end {
                continue;
            }

            let Some(email) = embedded_str(row, "patients", "email") else {
                debug!("Home visit {}: patient has no registered email, skipping", id);
                continue;
            };

            let patient_name = embedded_str(row, "patients", "first_name").unwrap_or("there");
            let service_type = row.get("service_type").and_then(Value::as_str).unwrap_or("care");

            let message = EmailMessage {
                to: email.to_string(),
                subject: "Home visit reminder".to_string(),
                html: format!(
                    "<p>Hi {},</p><p>Your {} home visit is scheduled for {}.</p>",
                    patient_name,
                    service_type,
                    start.format("%H:%M on %d %b %Y"),
                ),
            };

            if let Err(e) = self.mailer.send(&message).await {
                warn!("Home visit {} reminder failed, will retry: {}", id, e);
                continue;
            }

            sent += 1;

            if let Err(e) = self.mark_reminded("home_visits", id).await {
                warn!("Home visit {} reminder sent but flag write failed (duplicate possible): {}", id, e);
            }
        }

        Ok(sent)
    }

    async fn mark_reminded(&self, table: &str, id: i64) -> Result<(), NotificationError> {
        let path = format!("/rest/v1/{}?id=eq.{}", table, id);
        let update_data = json!({ "reminder_sent": true });

        let _: Vec<Value> = self.supabase.service_request_with_headers(
            Method::PATCH,
            &path,
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn scheduled_start(row: &Value, date_field: &str, time_field: &str) -> Option<DateTime<Utc>> {
    let date = row.get(date_field)?.as_str()?;
    let time = row.get(time_field)?.as_str()?;

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;

    Some(date.and_time(time).and_utc())
}
