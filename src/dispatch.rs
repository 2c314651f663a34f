//! Directive dispatch.
//!
//! One handler per directive type, run sequentially in detection order. A
//! handler failure becomes an inline note appended to the display text and
//! never aborts the remaining directives. External collaborators sit behind
//! ports returning a human-readable success string or a string beginning
//! with `Error: ` — the soft-failure contract.

use crate::consult::ConsultPort;
use crate::directive::{self, Directive};
use crate::error::HiveError;
use crate::persona::Persona;
use crate::store::TaskLog;
use chrono::{Duration, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

const SOFT_FAILURE_PREFIX: &str = "Error:";

// ─── Collaborator ports ─────────────────────────────────────────────────────

pub trait CalendarPort: Send + Sync {
    fn create_event<'a>(
        &'a self,
        title: &'a str,
        start_time: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;
}

pub trait MailPort: Send + Sync {
    fn send<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;
}

pub trait DocumentPort: Send + Sync {
    fn generate_spreadsheet<'a>(
        &'a self,
        filename: &'a str,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;

    fn generate_document<'a>(
        &'a self,
        filename: &'a str,
        title: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;

    fn generate_slides<'a>(
        &'a self,
        filename: &'a str,
        title: &'a str,
        slides: Vec<directive::Slide>,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>>;
}

/// Calendar stand-in used when no real integration is wired up.
pub struct SimulatedCalendar;

impl CalendarPort for SimulatedCalendar {
    fn create_event<'a>(
        &'a self,
        title: &'a str,
        start_time: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move { format!("Created event \"{title}\" starting {start_time}") })
    }
}

/// Mail stand-in used when no real integration is wired up.
pub struct SimulatedMail;

impl MailPort for SimulatedMail {
    fn send<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        _body: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move { format!("Queued \"{subject}\" to {to}") })
    }
}

/// Document collaborator that hands out deterministic download links under a
/// configured public base URL.
pub struct StaticLinkDocuments {
    base_url: String,
}

impl StaticLinkDocuments {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn link(&self, filename: &str, ext: &str) -> String {
        format!("{}/{}.{}", self.base_url, filename, ext)
    }
}

impl DocumentPort for StaticLinkDocuments {
    fn generate_spreadsheet<'a>(
        &'a self,
        filename: &'a str,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move {
            if rows.is_empty() {
                return "Error: no table rows found in the response".into();
            }
            self.link(filename, "xlsx")
        })
    }

    fn generate_document<'a>(
        &'a self,
        filename: &'a str,
        _title: &'a str,
        _body: &'a str,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move { self.link(filename, "docx") })
    }

    fn generate_slides<'a>(
        &'a self,
        filename: &'a str,
        _title: &'a str,
        _slides: Vec<directive::Slide>,
    ) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
        Box::pin(async move { self.link(filename, "pptx") })
    }
}

// ─── Dispatcher ─────────────────────────────────────────────────────────────

pub struct DispatchContext<'a> {
    pub user: &'a str,
    pub persona: &'a Persona,
    /// Tag-stripped completion text at parse time; GENERATE_FILE content is
    /// extracted from this, not from the running display text.
    pub raw_display: &'a str,
    /// External authorization (calendar/mail) is active for this turn.
    pub authorized: bool,
    /// Nesting depth; directives are only dispatched at depth 0.
    pub depth: u8,
}

#[derive(Debug)]
pub struct DispatchResult {
    pub text: String,
    /// Directives that completed their success effect.
    pub completed: usize,
}

pub struct Dispatcher {
    calendar: Arc<dyn CalendarPort>,
    mail: Arc<dyn MailPort>,
    documents: Arc<dyn DocumentPort>,
    tasks: Arc<dyn TaskLog>,
    image_base_url: String,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        calendar: Arc<dyn CalendarPort>,
        mail: Arc<dyn MailPort>,
        documents: Arc<dyn DocumentPort>,
        tasks: Arc<dyn TaskLog>,
        image_base_url: &str,
    ) -> Self {
        Self {
            calendar,
            mail,
            documents,
            tasks,
            image_base_url: image_base_url.to_string(),
        }
    }

    /// Run every directive in order. Only a consultation depth violation can
    /// abort; everything else degrades to inline notes.
    pub async fn dispatch(
        &self,
        directives: &[Directive],
        display_text: String,
        consultant: &dyn ConsultPort,
        ctx: &DispatchContext<'_>,
    ) -> Result<DispatchResult, HiveError> {
        let mut result = DispatchResult {
            text: display_text,
            completed: 0,
        };

        for directive in directives {
            match directive.kind.as_str() {
                "CONSULT" => self.handle_consult(directive, consultant, ctx, &mut result).await?,
                "CALENDAR_BOOK" => self.handle_calendar(directive, ctx, &mut result).await,
                "GMAIL_SEND" => self.handle_mail(directive, ctx, &mut result).await,
                "GENERATE_FILE" => self.handle_file(directive, ctx, &mut result).await,
                "GENERATE_IMAGE" => self.handle_image(directive, ctx, &mut result).await,
                other => {
                    append_note(&mut result.text, &format!("(unknown function: {other})"));
                }
            }
        }

        Ok(result)
    }

    async fn handle_consult(
        &self,
        directive: &Directive,
        consultant: &dyn ConsultPort,
        ctx: &DispatchContext<'_>,
        result: &mut DispatchResult,
    ) -> Result<(), HiveError> {
        let (Some(agent), Some(query)) = (directive.param("agent"), directive.param("query"))
        else {
            append_note(&mut result.text, "(CONSULT: missing agent or query)");
            return Ok(());
        };

        // No match or a swallowed nested failure leaves the text unchanged;
        // a depth violation is a hard error.
        if let Some(replacement) = consultant.consult(agent, query, ctx.depth).await? {
            result.text = replacement;
            result.completed += 1;
        }
        Ok(())
    }

    async fn handle_calendar(
        &self,
        directive: &Directive,
        ctx: &DispatchContext<'_>,
        result: &mut DispatchResult,
    ) {
        if !ctx.persona.permissions.calendar_mail || !ctx.authorized {
            append_note(
                &mut result.text,
                &format!(
                    "💡 (Tip: enable calendar and mail authorization for {})",
                    ctx.persona.name
                ),
            );
            return;
        }
        let Some(title) = directive.param("title") else {
            append_note(&mut result.text, "❌ **Calendar**: missing event title.");
            return;
        };
        let start_time = directive
            .param("time")
            .map_or_else(default_event_time, ToString::to_string);

        let outcome = self.calendar.create_event(title, &start_time).await;
        if outcome.starts_with(SOFT_FAILURE_PREFIX) {
            tracing::warn!(title, outcome = outcome.as_str(), "Calendar booking failed");
            append_note(
                &mut result.text,
                &format!("❌ **Calendar**: could not book \"{title}\"."),
            );
            return;
        }

        append_note(
            &mut result.text,
            &format!("✅ **Calendar**: booked \"{title}\"."),
        );
        self.log_task(
            ctx,
            &format!("Booked \"{title}\""),
            &format!("Calendar event created for {start_time}"),
        )
        .await;
        result.completed += 1;
    }

    async fn handle_mail(
        &self,
        directive: &Directive,
        ctx: &DispatchContext<'_>,
        result: &mut DispatchResult,
    ) {
        if !ctx.persona.permissions.calendar_mail || !ctx.authorized {
            append_note(
                &mut result.text,
                &format!(
                    "💡 (Tip: enable calendar and mail authorization for {})",
                    ctx.persona.name
                ),
            );
            return;
        }
        let Some(to) = directive.param("to") else {
            append_note(&mut result.text, "❌ **Mail**: missing recipient.");
            return;
        };
        let subject = directive
            .param("subject")
            .map_or_else(|| format!("Message from {}", ctx.persona.name), ToString::to_string);
        let body = directive.param("body").unwrap_or_default();

        let outcome = self.mail.send(to, &subject, body).await;
        if outcome.starts_with(SOFT_FAILURE_PREFIX) {
            tracing::warn!(to, outcome = outcome.as_str(), "Mail send failed");
            append_note(&mut result.text, "❌ **Mail**: could not send.");
            return;
        }

        append_note(&mut result.text, &format!("📧 **Mail**: sent to {to}"));
        self.log_task(
            ctx,
            &format!("Sent mail to {to}"),
            &format!("Subject: {subject}"),
        )
        .await;
        result.completed += 1;
    }

    async fn handle_file(
        &self,
        directive: &Directive,
        ctx: &DispatchContext<'_>,
        result: &mut DispatchResult,
    ) {
        let Some(file_type) = directive.param("type") else {
            append_note(&mut result.text, "❌ Could not create the file: missing type.");
            return;
        };
        let filename = directive.param("filename").unwrap_or("Document");

        let outcome = match file_type {
            "xlsx" => {
                let rows = directive::spreadsheet_rows(ctx.raw_display);
                self.documents.generate_spreadsheet(filename, rows).await
            }
            "docx" => {
                self.documents
                    .generate_document(filename, filename, ctx.raw_display)
                    .await
            }
            "pptx" => {
                let slides = directive::slide_blocks(ctx.raw_display, filename);
                self.documents
                    .generate_slides(filename, filename, slides)
                    .await
            }
            other => {
                append_note(
                    &mut result.text,
                    &format!("❌ Could not create the file: unsupported type \"{other}\"."),
                );
                return;
            }
        };

        if outcome.starts_with(SOFT_FAILURE_PREFIX) {
            tracing::warn!(
                filename,
                file_type,
                outcome = outcome.as_str(),
                "File generation failed"
            );
            append_note(&mut result.text, "❌ Could not create the file. Try again.");
            return;
        }

        let label = match file_type {
            "xlsx" => "📊 **Spreadsheet created**",
            "docx" => "📝 **Document created**",
            _ => "📽️ **Presentation created**",
        };
        append_note(
            &mut result.text,
            &format!("{label}: [Download {filename}.{file_type}]({outcome})"),
        );
        self.log_task(
            ctx,
            &format!("Created file: {filename}.{file_type}"),
            "File generated and saved",
        )
        .await;
        result.completed += 1;
    }

    async fn handle_image(
        &self,
        directive: &Directive,
        ctx: &DispatchContext<'_>,
        result: &mut DispatchResult,
    ) {
        let Some(prompt) = directive.param("prompt") else {
            append_note(&mut result.text, "❌ **Image**: missing prompt.");
            return;
        };

        let url = match image_url(&self.image_base_url, prompt) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "Image URL construction failed");
                append_note(&mut result.text, "❌ **Image**: could not build the image link.");
                return;
            }
        };

        append_note(
            &mut result.text,
            &format!("🎨 **Image generated:**\n![Generated image]({url})\n\n[Download image]({url})"),
        );
        let summary: String = prompt.chars().take(50).collect();
        self.log_task(ctx, &format!("Created image: {summary}"), "Image generated")
            .await;
        result.completed += 1;
    }

    async fn log_task(&self, ctx: &DispatchContext<'_>, title: &str, description: &str) {
        if let Err(err) = self
            .tasks
            .record(ctx.user, ctx.persona.name, title, description)
            .await
        {
            tracing::warn!(error = %err, "Task log write failed");
        }
    }
}

fn append_note(text: &mut String, note: &str) {
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(note);
}

fn default_event_time() -> String {
    (Utc::now() + Duration::hours(1)).to_rfc3339()
}

/// Percent-encode the prompt into the image service URL as a path segment.
fn image_url(base: &str, prompt: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("image base URL cannot be a base"))?
        .push(prompt);
    Ok(url.to_string())
}
