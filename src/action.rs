use clap::{Args, Parser, Subcommand};
use pet_care::{
    Connection,
    api::{appointment, pet, photo},
    config::AppConfig,
    connection::HealthStatus,
    models::{Table, appointment::AppointmentStatus, pet::NewPet},
    realtime::{ChangeEvent, RealtimeClient},
    repo::{self, supabase::SupabaseRepo},
};
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    id: String,
}

#[derive(Args, Debug, Clone)]
pub struct GetPetArgs {
    id: String,
    /// Include appointments and photos
    #[arg(short, long)]
    profile: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PetIdArgs {
    pet_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct CreatePetArgs {
    #[arg(short, long)]
    name: String,
    /// Kind of animal, e.g. dog
    #[arg(short = 't', long = "type")]
    pet_type: String,
    #[arg(short, long)]
    owner_id: String,
    #[arg(short, long)]
    breed: Option<String>,
    #[arg(short, long)]
    age: Option<i32>,
}

#[derive(Args, Debug, Clone)]
pub struct DeletePetArgs {
    id: String,
    /// Succeed when the pet is already gone
    #[arg(long)]
    if_exists: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SetStatusArgs {
    id: String,
    /// scheduled, completed or cancelled
    #[arg(value_parser = parse_status)]
    status: AppointmentStatus,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// pets, appointments or pet_photos
    table: Table,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Action {
    /// Check that the backend is configured and reachable
    Check,
    ListPets,
    GetPet(GetPetArgs),
    CreatePet(CreatePetArgs),
    DeletePet(DeletePetArgs),
    /// Appointments of a pet, earliest first
    Appointments(PetIdArgs),
    SetAppointmentStatus(SetStatusArgs),
    DeleteAppointment(IdArgs),
    /// Photos of a pet, newest first
    Photos(PetIdArgs),
    DeletePhoto(IdArgs),
    /// Print row changes of a table until interrupted
    Watch(WatchArgs),
}

/// Command line access to the pet care backend
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct AppArgs {
    #[command(subcommand)]
    pub action: Action,
}

impl AppArgs {
    pub async fn run(&self, config: &AppConfig) -> anyhow::Result<()> {
        let connection = Connection::from_config(config);
        let repo: repo::ImplPetRepo = Box::new(SupabaseRepo::new(connection.clone()));

        match &self.action {
            Action::Check => check(&connection).await,
            Action::ListPets => print_json(&pet::list_pets(&repo).await?),
            Action::GetPet(GetPetArgs { id, profile }) => {
                if *profile {
                    print_json(&pet::get_pet_profile(&repo, id).await?)
                } else {
                    print_json(&pet::get_pet(&repo, id).await?)
                }
            }
            Action::CreatePet(args) => {
                let new_pet = NewPet {
                    name: args.name.clone(),
                    pet_type: args.pet_type.clone(),
                    owner_id: args.owner_id.clone(),
                    breed: args.breed.clone(),
                    age: args.age,
                    ..Default::default()
                };
                print_json(&pet::create_pet(&repo, &new_pet).await?)
            }
            Action::DeletePet(DeletePetArgs { id, if_exists }) => {
                if *if_exists {
                    let deleted = pet::delete_pet_if_exists(&repo, id).await?;
                    println!("{}", if deleted { "deleted" } else { "already gone" });
                } else {
                    pet::delete_pet(&repo, id).await?;
                    println!("deleted");
                }
                Ok(())
            }
            Action::Appointments(PetIdArgs { pet_id }) => {
                print_json(&appointment::list_appointments_by_pet(&repo, pet_id).await?)
            }
            Action::SetAppointmentStatus(SetStatusArgs { id, status }) => {
                print_json(&appointment::set_appointment_status(&repo, id, *status).await?)
            }
            Action::DeleteAppointment(IdArgs { id }) => {
                appointment::delete_appointment(&repo, id).await?;
                println!("deleted");
                Ok(())
            }
            Action::Photos(PetIdArgs { pet_id }) => {
                print_json(&photo::list_photos_by_pet(&repo, pet_id).await?)
            }
            Action::DeletePhoto(IdArgs { id }) => {
                photo::delete_photo(&repo, id).await?;
                println!("deleted");
                Ok(())
            }
            Action::Watch(WatchArgs { table }) => watch(connection, *table).await,
        }
    }
}

async fn check(connection: &Connection) -> anyhow::Result<()> {
    match connection.check_health().await {
        HealthStatus::Connected { pet_count } => {
            let count = pet_count.map_or("unknown".to_string(), |c| c.to_string());
            println!("connected to {} ({count} pets)", connection.endpoint());
            Ok(())
        }
        HealthStatus::SchemaMissing { message } => {
            anyhow::bail!("backend reachable but the schema is missing: {message}")
        }
        HealthStatus::Unreachable(e) => Err(e.into()),
    }
}

async fn watch(connection: Connection, table: Table) -> anyhow::Result<()> {
    let client = RealtimeClient::new(connection);
    let subscription = client.subscribe(table, print_change).await?;
    println!("watching {table}, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    subscription.unsubscribe();
    client.close();
    Ok(())
}

fn print_change(event: &ChangeEvent) {
    let row = event.new.as_ref().or(event.old.as_ref());
    let row = row.map(|r| serde_json::Value::Object(r.clone()));

    println!(
        "{} {} {}",
        event.kind,
        event.table,
        row.map(|r| r.to_string()).unwrap_or_default()
    );
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_status(value: &str) -> Result<AppointmentStatus, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("unknown status {value}, expected scheduled, completed or cancelled"))
}
