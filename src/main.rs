mod api;
mod cep;
mod cli;
mod config;
mod models;
mod session;
mod storage;
mod validation;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;

use crate::models::DemandaInput;

#[derive(Parser)]
#[command(
    name = "doados",
    about = "Command-line client for the Achados e Doados donation platform"
)]
pub struct Args {
    #[arg(long, env = "DOADOS_API_URL", help = "Base URL of the backend API")]
    pub api_url: Option<String>,

    #[arg(long, help = "Session/data directory (default: ~/.doados)")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Verbose output (print HTTP requests)")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and cache the session
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        senha: Option<String>,
    },
    /// Clear the cached session (best-effort server logout)
    Logout,
    /// Show the logged-in profile
    Whoami {
        #[arg(long, help = "Revalidate the token against the server")]
        remote: bool,
    },
    /// Register a new account
    #[command(subcommand)]
    Cadastro(CadastroCommand),
    /// Browse and manage demandas
    #[command(subcommand)]
    Demandas(DemandasCommand),
    /// List registered institutions
    Instituicoes,
    /// Register a donation intent for a demanda
    Doar { demanda_id: i64 },
    /// List or update donation intents
    #[command(subcommand)]
    Doacoes(DoacoesCommand),
    /// Look up an address by CEP
    Cep { cep: String },
    /// Watch the session for changes made by other processes
    Watch {
        #[arg(long, default_value_t = 2, help = "Poll interval in seconds")]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum CadastroCommand {
    /// Donor account
    Doador {
        #[arg(long)]
        nome: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "Prompted for when omitted")]
        senha: Option<String>,
        #[arg(long, help = "CEP used to prefill the address")]
        cep: Option<String>,
    },
    /// Institution account
    Instituicao {
        #[arg(long)]
        nome: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "Prompted for when omitted")]
        senha: Option<String>,
        #[arg(long)]
        telefone: Option<String>,
        #[arg(long, help = "CEP used to prefill the address")]
        cep: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DemandasCommand {
    /// List public demandas
    List {
        #[arg(long, help = "Filter by title")]
        titulo: Option<String>,
    },
    /// Show one demanda in full
    Show { id: i64 },
    /// Publish a demanda (institution account)
    Create {
        #[arg(long)]
        titulo: String,
        #[arg(long)]
        categoria: String,
        #[arg(long)]
        descricao: String,
        #[arg(long, help = "Free-form quantity, e.g. \"50 peças\"")]
        quantidade: Option<String>,
        #[arg(long, help = "Baixa, Média or Alta")]
        urgencia: Option<String>,
        #[arg(long, help = "Desired deadline (YYYY-MM-DD)")]
        prazo: Option<NaiveDate>,
        #[arg(long, help = "Numeric goal")]
        meta: Option<i32>,
    },
    /// Update a demanda (institution account)
    Edit {
        id: i64,
        #[arg(long)]
        titulo: Option<String>,
        #[arg(long)]
        categoria: Option<String>,
        #[arg(long)]
        descricao: Option<String>,
        #[arg(long)]
        quantidade: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        urgencia: Option<String>,
        #[arg(long)]
        prazo: Option<NaiveDate>,
        #[arg(long)]
        meta: Option<i32>,
    },
    /// Delete a demanda (institution account)
    Delete {
        id: i64,
        #[arg(long, help = "Skip confirmation")]
        yes: bool,
    },
    /// List the logged-in institution's own demandas
    Minhas,
}

#[derive(Subcommand)]
pub enum DoacoesCommand {
    /// Donations made by the logged-in donor
    Minhas,
    /// Donations registered against a demanda
    Demanda { id: i64 },
    /// Update a donation's status (institution account)
    Status { id: i64, status: String },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load configuration, then apply CLI/env overrides
    let mut config = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_default()
    };
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        anyhow::bail!("invalid configuration");
    }

    let storage = storage::FileStorage::new(&config.data_dir());
    let session = Rc::new(session::SessionStore::new(Box::new(storage)));
    let api = api::ApiClient::new(&config.api.base_url, Rc::clone(&session))
        .with_verbose(args.verbose);

    let ctx = cli::Context {
        config,
        session,
        api,
    };

    match args.command {
        Command::Login { email, senha } => cli::login(&ctx, email, senha),
        Command::Logout => cli::logout(&ctx),
        Command::Whoami { remote } => cli::whoami(&ctx, remote),
        Command::Cadastro(CadastroCommand::Doador {
            nome,
            email,
            senha,
            cep,
        }) => cli::cadastro_doador(&ctx, nome, email, senha, cep),
        Command::Cadastro(CadastroCommand::Instituicao {
            nome,
            email,
            senha,
            telefone,
            cep,
        }) => cli::cadastro_instituicao(&ctx, nome, email, senha, telefone, cep),
        Command::Demandas(DemandasCommand::List { titulo }) => cli::demandas_list(&ctx, titulo),
        Command::Demandas(DemandasCommand::Show { id }) => cli::demanda_show(&ctx, id),
        Command::Demandas(DemandasCommand::Create {
            titulo,
            categoria,
            descricao,
            quantidade,
            urgencia,
            prazo,
            meta,
        }) => cli::demanda_create(
            &ctx,
            DemandaInput {
                titulo,
                categoria,
                descricao,
                quantidade_descricao: quantidade,
                status: None,
                nivel_urgencia: urgencia,
                prazo_desejado: prazo,
                meta_numerica: meta,
            },
        ),
        Command::Demandas(DemandasCommand::Edit {
            id,
            titulo,
            categoria,
            descricao,
            quantidade,
            status,
            urgencia,
            prazo,
            meta,
        }) => cli::demanda_edit(
            &ctx,
            id,
            cli::DemandaEdit {
                titulo,
                categoria,
                descricao,
                quantidade,
                status,
                urgencia,
                prazo,
                meta,
            },
        ),
        Command::Demandas(DemandasCommand::Delete { id, yes }) => {
            cli::demanda_delete(&ctx, id, yes)
        }
        Command::Demandas(DemandasCommand::Minhas) => cli::minhas_demandas(&ctx),
        Command::Instituicoes => cli::instituicoes(&ctx),
        Command::Doar { demanda_id } => cli::doar(&ctx, demanda_id),
        Command::Doacoes(DoacoesCommand::Minhas) => cli::doacoes_minhas(&ctx),
        Command::Doacoes(DoacoesCommand::Demanda { id }) => cli::doacoes_demanda(&ctx, id),
        Command::Doacoes(DoacoesCommand::Status { id, status }) => {
            cli::doacao_status(&ctx, id, status)
        }
        Command::Cep { cep } => cli::cep_lookup(&cep),
        Command::Watch { interval } => cli::watch(&ctx, interval),
    }
}
