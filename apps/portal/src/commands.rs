use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::debug;
use uuid::Uuid;

use appointment_cell::services::schedule::is_within_edit_window;
use appointment_cell::{AppointmentApi, BookingWorkflow, HttpAppointmentApi, ScheduleService};
use doctor_cell::{department_name, DepartmentMatchingService, DoctorService};
use patient_cell::{PatientService, RecordService};
use shared_api_client::PortalClient;
use shared_models::auth::SessionProvider;
use shared_utils::dates::{self, Clock, SystemClock};

#[derive(Parser)]
#[command(name = "care-portal")]
#[command(version = "0.1.0")]
#[command(about = "Command-line client for the clinic patient portal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List departments
    Departments,

    /// List doctors, your assigned doctor first
    Doctors {
        /// Only doctors in this department
        #[arg(short, long)]
        department: Option<Uuid>,
    },

    /// Suggest a department for a description of the issue
    Recommend {
        /// Free-text description
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List bookable services and their fees
    Services,

    /// Days a doctor has open slots, today through the same day next month
    Availability {
        doctor: Uuid,
    },

    /// Open slots for a doctor on a day
    Slots {
        doctor: Uuid,

        /// Day as YYYY-MM-DD
        date: NaiveDate,
    },

    /// Book an appointment
    Book {
        #[arg(long)]
        doctor: Uuid,

        /// Day as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// Slot start as offered by `slots` (HH:MM or RFC 3339)
        #[arg(long)]
        slot: String,

        /// Service id; repeat for several services
        #[arg(long = "service", required = true)]
        services: Vec<Uuid>,
    },

    /// Show your medical record
    Record,

    /// Show changes made to your medical record
    History {
        /// Change type to show (substring match), or "all"
        #[arg(short, long, default_value = "all")]
        filter: String,
    },

    /// Doctors: list your patients
    Patients,

    /// Doctors: appointments on a day and the month's busy days
    Schedule {
        /// Day as YYYY-MM-DD, today if omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

pub async fn run(
    command: Commands,
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
) -> anyhow::Result<()> {
    match command {
        Commands::Departments => {
            let departments = DoctorService::new(client, session).list_departments().await?;
            for department in departments {
                println!("{}  {}", department.id, department.name);
            }
        }
        Commands::Doctors { department } => {
            let service = DoctorService::new(client, session);
            let departments = service.list_departments().await?;
            for doctor in service.list_doctors(department).await? {
                println!(
                    "{}  {}  ({})",
                    doctor.id,
                    doctor.name,
                    department_name(&departments, doctor.department_id)
                );
            }
        }
        Commands::Recommend { text } => {
            let recommendation = DepartmentMatchingService::new(Arc::clone(&client), Arc::clone(&session))
                .recommend_department(&text.join(" "))
                .await?;
            let departments = DoctorService::new(client, session).list_departments().await?;

            println!(
                "Recommended: {}",
                department_name(&departments, Some(recommendation.department_id))
            );
            println!("{}", recommendation.explanation);
        }
        Commands::Services => {
            let services = HttpAppointmentApi::new(client, session).service_catalog().await?;
            for service in services {
                println!("{}  {:>8}  {}", service.id, service.fee.to_string(), service.name);
            }
        }
        Commands::Availability { doctor } => {
            let (start, end) = dates::availability_window(SystemClock.today());
            let calendar = HttpAppointmentApi::new(client, session)
                .doctor_availability(doctor, start, end)
                .await?;

            if calendar.is_empty() {
                println!("No available days between {} and {}", start, end);
            }
            for day in calendar.days().filter(|day| *day >= start) {
                println!("{}", day);
            }
        }
        Commands::Slots { doctor, date } => {
            let slots = HttpAppointmentApi::new(client, session).doctor_slots(doctor, date).await?;

            if slots.is_empty() {
                println!("No open slots on {}", date);
            }
            for slot in slots.slots() {
                println!("{}  ({})", slot.starts_at.format("%H:%M"), slot.raw);
            }
        }
        Commands::Book { doctor, date, slot, services } => {
            book(client, session, doctor, date, &slot, services).await?;
        }
        Commands::Record => {
            let record = RecordService::new(client, session).my_record().await?;
            let Some(record) = record else {
                println!("No medical record on file");
                return Ok(());
            };

            let data = &record.data;
            println!("Blood type:  {}", data.blood_type.as_deref().unwrap_or("Not specified"));
            println!("Allergies:   {}", list_or_none(&data.allergies));
            println!("Medications: {}", list_or_none(&data.medications));
            println!("Conditions:  {}", list_or_none(&data.conditions));
            if let Some(contact) = &data.emergency_contact {
                println!("Emergency:   {} ({}) {}", contact.name, contact.relationship, contact.phone);
            }
            if let Some(insurance) = &data.insurance {
                println!("Insurance:   {} #{}", insurance.provider, insurance.policy_number);
            }
            println!("Last edited: {}", dates::format_timestamp(record.last_edited_at));
        }
        Commands::History { filter } => {
            let history = RecordService::new(client, session).history().await?;
            let shown: Vec<_> = history.iter().filter(|entry| entry.matches_filter(&filter)).collect();

            if shown.is_empty() {
                println!("No history found");
            }
            for entry in shown {
                println!(
                    "{}  {}  by {}",
                    entry.change_timestamp.format("%Y-%m-%d %H:%M"),
                    entry.display_type(),
                    entry.changed_by.as_deref().unwrap_or("unknown")
                );
            }
        }
        Commands::Patients => {
            for patient in PatientService::new(client, session).list_patients().await? {
                println!("{}  {}  <{}>", patient.id, patient.name, patient.email);
            }
        }
        Commands::Schedule { date } => {
            let day = date.unwrap_or_else(|| SystemClock.today());
            schedule(client, session, day).await?;
        }
    }

    Ok(())
}

async fn book(
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
    doctor_id: Uuid,
    date: NaiveDate,
    slot: &str,
    mut services: Vec<Uuid>,
) -> anyhow::Result<()> {
    let doctor = DoctorService::new(Arc::clone(&client), Arc::clone(&session))
        .list_doctors(None)
        .await?
        .into_iter()
        .find(|doctor| doctor.id == doctor_id)
        .with_context(|| format!("Doctor {} not found", doctor_id))?;

    let api = Arc::new(HttpAppointmentApi::new(client, session));
    let mut workflow = BookingWorkflow::new(api, Arc::new(SystemClock));

    workflow.select_doctor(doctor).await;
    fail_on_alerts(&mut workflow)?;

    if !workflow.is_date_selectable(date) {
        let offered: Vec<String> = workflow.selectable_dates().iter().map(NaiveDate::to_string).collect();
        bail!(
            "{} is not available. Available days: {}",
            date,
            if offered.is_empty() { "none".to_string() } else { offered.join(", ") }
        );
    }

    workflow.select_date(date).await?;
    fail_on_alerts(&mut workflow)?;

    let starts_at = dates::parse_slot(slot, date).map_err(anyhow::Error::msg)?;
    workflow.select_slot(starts_at)?;

    services.sort();
    services.dedup();
    for service_id in services {
        workflow.toggle_service(service_id)?;
    }
    debug!("Booking stage: {:?}", workflow.stage());
    println!("Total fee: {}", workflow.total_fee());

    let appointment = workflow.submit().await?;
    println!(
        "Booked appointment {} at {}",
        appointment.id,
        dates::format_timestamp(appointment.appointment_time)
    );
    Ok(())
}

async fn schedule(
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
    day: NaiveDate,
) -> anyhow::Result<()> {
    let schedule = ScheduleService::new(client, session);

    let calendar = schedule.month_calendar(day).await?;
    let busy: Vec<String> = calendar.days().map(|d| d.format("%d").to_string()).collect();
    println!("Busy days in {}: {}", day.format("%B %Y"), list_or_none(&busy));

    let appointments = schedule.appointments_on(day).await?;
    if appointments.is_empty() {
        println!("No appointments for {}", day);
    }

    let now = Utc::now();
    for appointment in appointments {
        let services = schedule.appointment_services(appointment.id).await?;
        let names: Vec<String> = services.into_iter().map(|service| service.name).collect();
        let editable = if is_within_edit_window(appointment.appointment_time, now) { "  [editable]" } else { "" };

        println!(
            "{}  {}  {}  {}{}",
            appointment.appointment_time.format("%H:%M"),
            appointment.patient_name.as_deref().unwrap_or("Patient"),
            appointment.status,
            list_or_none(&names),
            editable
        );
    }
    Ok(())
}

fn fail_on_alerts(workflow: &mut BookingWorkflow) -> anyhow::Result<()> {
    let alerts = workflow.take_alerts();
    if !alerts.is_empty() {
        bail!(alerts.join(" "));
    }
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}
