use chrono::Local;
use clap::Args;
use loan_advisor::config::{AdvisorConfig, AppConfig};
use loan_advisor::error::AppError;
use loan_advisor::workflows::intake::{
    DocumentHandle, DocumentSlot, FieldId, IntakeBlueprint, Notification, NotificationSeverity,
    Notifier, NotifyError, SimulatedDocumentProcessor, TranscriptRole, WizardEngine, WizardError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Applicant full name
    #[arg(long, default_value = "Asha Rao")]
    pub(crate) name: String,
    /// Applicant age in years
    #[arg(long, default_value = "34")]
    pub(crate) age: String,
    /// Monthly income in rupees
    #[arg(long, default_value = "50000")]
    pub(crate) income: String,
    /// One of the offered loan types
    #[arg(long, default_value = "Home Loan")]
    pub(crate) loan_type: String,
    /// Requested loan amount in rupees
    #[arg(long, default_value = "2500000")]
    pub(crate) loan_amount: String,
    /// Existing monthly EMI total in rupees
    #[arg(long, default_value = "5000")]
    pub(crate) emis: String,
    /// Credit score (300-850)
    #[arg(long, default_value = "700")]
    pub(crate) credit_score: String,
    /// PAN number
    #[arg(long, default_value = "ABCDE1234F")]
    pub(crate) pan_number: String,
    /// Salary slip file name (pdf, jpg, jpeg or png)
    #[arg(long, default_value = "salary-slip.pdf")]
    pub(crate) salary_slip: String,
    /// Aadhaar card file name (pdf, jpg, jpeg or png)
    #[arg(long, default_value = "aadhaar-card.jpg")]
    pub(crate) aadhaar_card: String,
    /// Skip the simulated document and analysis delays
    #[arg(long)]
    pub(crate) fast: bool,
}

impl DemoArgs {
    fn answers(&self) -> [(FieldId, &str); 8] {
        [
            (FieldId::Name, self.name.as_str()),
            (FieldId::Age, self.age.as_str()),
            (FieldId::Income, self.income.as_str()),
            (FieldId::LoanType, self.loan_type.as_str()),
            (FieldId::LoanAmount, self.loan_amount.as_str()),
            (FieldId::Emis, self.emis.as_str()),
            (FieldId::CreditScore, self.credit_score.as_str()),
            (FieldId::PanNumber, self.pan_number.as_str()),
        ]
    }
}

/// Prints toasts inline with the transcript.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let marker = match notification.severity {
            NotificationSeverity::Info => "info",
            NotificationSeverity::Critical => "alert",
        };
        println!(
            "  [{marker}] {}: {}",
            notification.title, notification.description
        );
        Ok(())
    }
}

pub(crate) async fn run(args: DemoArgs) -> Result<(), AppError> {
    let mut advisor = AppConfig::load()?.advisor;
    if args.fast {
        advisor = AdvisorConfig {
            document_delay: Duration::ZERO,
            analysis_delay: Duration::ZERO,
            ..advisor
        };
    }

    println!("Loan advisor demo");
    let mut engine = WizardEngine::new(
        Arc::new(IntakeBlueprint::standard()),
        advisor.engine_settings(),
        Arc::new(ConsoleNotifier),
    );

    for (field, value) in args.answers() {
        engine.set_field(field, value)?;
        engine.advance()?;
    }

    for (slot, file_name) in [
        (DocumentSlot::SalarySlip, &args.salary_slip),
        (DocumentSlot::AadhaarCard, &args.aadhaar_card),
    ] {
        let handle =
            DocumentHandle::from_file_name(file_name.as_str()).map_err(WizardError::from)?;
        engine.set_document(slot, handle)?;
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let processor = SimulatedDocumentProcessor::new(advisor.document_delay);
    let outcome = engine.evaluate(&processor, &cancel).await;

    println!("\nTranscript");
    for entry in engine.transcript().entries() {
        let speaker = match entry.role {
            TranscriptRole::Advisor => "advisor",
            TranscriptRole::Applicant => "applicant",
        };
        println!(
            "{} {speaker:>9}: {}",
            entry.created_at.with_timezone(&Local).format("%H:%M:%S"),
            entry.content
        );
    }

    println!("\nApplication summary");
    for line in engine.blueprint().summary(engine.record()) {
        println!("- {}: {}", line.label, line.value);
    }

    let verdict = outcome?;
    println!(
        "\nVerdict: {}",
        if verdict.eligible {
            "eligible"
        } else {
            "not eligible"
        }
    );
    for field in &verdict.coerced_fields {
        println!("  note: {field} was not a number and counted as 0");
    }

    Ok(())
}
