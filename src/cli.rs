//! Command handlers. Each one reads/mutates the shared session store and
//! talks to the backend through the API client.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use std::rc::Rc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::cep;
use crate::config::Config;
use crate::models::{Demanda, DemandaInput, Doacao, NovaInstituicao, NovoDoador, User, UserKind};
use crate::session::{self, SessionStore};
use crate::storage::FileStorage;
use crate::validation;

pub struct Context {
    pub config: Config,
    pub session: Rc<SessionStore>,
    pub api: ApiClient,
}

/// Field overrides for `demandas edit`; unset fields keep the server value.
#[derive(Debug, Default)]
pub struct DemandaEdit {
    pub titulo: Option<String>,
    pub categoria: Option<String>,
    pub descricao: Option<String>,
    pub quantidade: Option<String>,
    pub status: Option<String>,
    pub urgencia: Option<String>,
    pub prazo: Option<NaiveDate>,
    pub meta: Option<i32>,
}

fn prompt(label: &str) -> Result<String> {
    let mut rl = rustyline::DefaultEditor::new()?;
    let line = rl.readline(label)?;
    Ok(line.trim().to_string())
}

fn require_login(ctx: &Context) -> Result<User> {
    // Token absence is the logged-out signal; a cached profile alone does
    // not count.
    if !ctx.session.is_logged_in() {
        bail!("not logged in; run `doados login` first");
    }
    ctx.session
        .user()
        .ok_or_else(|| anyhow!("session has no cached profile; log in again"))
}

fn require_instituicao(ctx: &Context) -> Result<User> {
    let user = require_login(ctx)?;
    if user.tipo != UserKind::Instituicao {
        bail!(
            "this command requires an institution account (logged in as {})",
            user.tipo
        );
    }
    Ok(user)
}

// --- auth ---

pub fn login(ctx: &Context, email: Option<String>, senha: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("E-mail: ")?,
    };
    let senha = match senha {
        Some(senha) => senha,
        None => prompt("Senha: ")?,
    };

    let resp = ctx.api.login(&email, &senha)?;
    let token_saved = ctx.session.save_token(&resp.token).is_saved();
    let user_saved = ctx.session.save_user(&resp.user).is_saved();
    if !token_saved || !user_saved {
        eprintln!("Warning: session could not be persisted; the login will not outlive this command");
    }
    println!("Logged in as {} ({})", resp.user.nome, resp.user.tipo);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    // Server-side revocation is best-effort; the local session is cleared
    // either way.
    if let Some(token) = ctx.session.token() {
        ctx.api.logout(&token);
    }
    ctx.session.clear_token();
    ctx.session.clear_user();
    println!("Logged out");
    Ok(())
}

pub fn whoami(ctx: &Context, remote: bool) -> Result<()> {
    if remote {
        let user = ctx.api.me()?;
        ctx.session.save_user(&user);
        print_user(&user);
        return Ok(());
    }

    match ctx.session.user() {
        Some(user) if ctx.session.is_logged_in() => print_user(&user),
        _ => println!("Not logged in"),
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.nome, user.email);
    println!("  id:   {}", user.id);
    println!("  tipo: {}", user.tipo);
    if let Some(url) = &user.foto_url {
        println!("  foto: {}", url);
    }
}

// --- registration ---

pub fn cadastro_doador(
    ctx: &Context,
    nome: String,
    email: String,
    senha: Option<String>,
    cep: Option<String>,
) -> Result<()> {
    if !validation::validate_email(&email)? {
        bail!("invalid e-mail address: {}", email);
    }
    let senha = match senha {
        Some(senha) => senha,
        None => prompt("Senha: ")?,
    };
    if !validation::validate_senha(&senha) {
        bail!("password must have at least 8 characters");
    }
    let (cep, endereco) = resolve_endereco(cep)?;

    let novo = NovoDoador {
        nome,
        email,
        senha,
        cep,
        endereco,
    };
    let criado = ctx.api.cadastrar_doador(&novo)?;
    println!("Doador #{} cadastrado; use `doados login` to sign in", criado.id);
    Ok(())
}

pub fn cadastro_instituicao(
    ctx: &Context,
    nome: String,
    email: String,
    senha: Option<String>,
    telefone: Option<String>,
    cep: Option<String>,
) -> Result<()> {
    if !validation::validate_email(&email)? {
        bail!("invalid e-mail address: {}", email);
    }
    let senha = match senha {
        Some(senha) => senha,
        None => prompt("Senha: ")?,
    };
    if !validation::validate_senha(&senha) {
        bail!("password must have at least 8 characters");
    }
    let (cep, endereco) = resolve_endereco(cep)?;

    let nova = NovaInstituicao {
        nome,
        email,
        senha,
        telefone,
        cep,
        endereco,
    };
    let criada = ctx.api.cadastrar_instituicao(&nova)?;
    println!(
        "Instituição #{} cadastrada; use `doados login` to sign in",
        criada.id
    );
    Ok(())
}

// Prefill the address from the CEP, as the web registration forms did.
fn resolve_endereco(cep: Option<String>) -> Result<(Option<String>, Option<String>)> {
    match cep {
        Some(cep) => {
            let endereco = cep::lookup(&cep)?;
            println!("CEP {}: {}", endereco.cep, endereco.linha());
            Ok((Some(cep::normalize(&cep)?), Some(endereco.linha())))
        }
        None => Ok((None, None)),
    }
}

// --- demandas ---

pub fn demandas_list(ctx: &Context, titulo: Option<String>) -> Result<()> {
    let demandas = ctx.api.demandas(titulo.as_deref())?;
    if demandas.is_empty() {
        println!("No demandas found");
        return Ok(());
    }
    for demanda in &demandas {
        print_demanda_line(demanda);
    }
    Ok(())
}

pub fn demanda_show(ctx: &Context, id: i64) -> Result<()> {
    let demanda = ctx.api.demanda(id)?;
    print_demanda(&demanda);
    Ok(())
}

pub fn demanda_create(ctx: &Context, input: DemandaInput) -> Result<()> {
    let user = require_instituicao(ctx)?;
    let criada = ctx.api.criar_demanda(user.id, &input)?;
    println!("Demanda #{} publicada: {}", criada.id, criada.titulo);
    Ok(())
}

pub fn demanda_edit(ctx: &Context, id: i64, edit: DemandaEdit) -> Result<()> {
    let user = require_instituicao(ctx)?;
    let current = ctx.api.demanda(id)?;
    let input = DemandaInput {
        titulo: edit.titulo.unwrap_or(current.titulo),
        categoria: edit.categoria.unwrap_or(current.categoria),
        descricao: edit.descricao.unwrap_or(current.descricao),
        quantidade_descricao: edit.quantidade.or(current.quantidade_descricao),
        status: edit.status.or(current.status),
        nivel_urgencia: edit.urgencia.or(current.nivel_urgencia),
        prazo_desejado: edit.prazo.or(current.prazo_desejado),
        meta_numerica: edit.meta.or(current.meta_numerica),
    };
    let atualizada = ctx.api.atualizar_demanda(user.id, id, &input)?;
    println!("Demanda #{} atualizada", atualizada.id);
    Ok(())
}

pub fn demanda_delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    let user = require_instituicao(ctx)?;
    if !yes {
        let answer = prompt(&format!("Delete demanda #{}? [y/N] ", id))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted");
            return Ok(());
        }
    }
    ctx.api.excluir_demanda(user.id, id)?;
    println!("Demanda #{} excluída", id);
    Ok(())
}

pub fn minhas_demandas(ctx: &Context) -> Result<()> {
    let user = require_instituicao(ctx)?;
    let demandas = ctx.api.minhas_demandas(user.id)?;
    if demandas.is_empty() {
        println!("No demandas published yet");
        return Ok(());
    }
    for demanda in &demandas {
        print_demanda_line(demanda);
    }
    Ok(())
}

fn print_demanda_line(demanda: &Demanda) {
    println!(
        "#{:<5} [{}] {} ({})",
        demanda.id,
        demanda.status.as_deref().unwrap_or("?"),
        demanda.titulo,
        demanda.categoria
    );
}

fn print_demanda(demanda: &Demanda) {
    println!("#{} {}", demanda.id, demanda.titulo);
    println!("  categoria:  {}", demanda.categoria);
    if let Some(status) = &demanda.status {
        println!("  status:     {}", status);
    }
    if let Some(urgencia) = &demanda.nivel_urgencia {
        println!("  urgência:   {}", urgencia);
    }
    if let Some(quantidade) = &demanda.quantidade_descricao {
        println!("  quantidade: {}", quantidade);
    }
    if let Some(prazo) = &demanda.prazo_desejado {
        println!("  prazo:      {}", prazo);
    }
    if let Some(meta) = demanda.meta_numerica {
        println!("  meta:       {}", meta);
    }
    if let Some(instituicao) = &demanda.instituicao {
        println!("  instituição: {} (#{})", instituicao.nome, instituicao.id);
    }
    println!();
    println!("{}", demanda.descricao);
}

// --- institutions ---

pub fn instituicoes(ctx: &Context) -> Result<()> {
    let instituicoes = ctx.api.instituicoes()?;
    if instituicoes.is_empty() {
        println!("No institutions registered");
        return Ok(());
    }
    for inst in &instituicoes {
        println!("#{:<5} {}", inst.id, inst.nome);
        if let Some(endereco) = &inst.endereco {
            println!("       {}", endereco);
        }
        if let Some(telefone) = &inst.telefone {
            println!("       tel: {}", telefone);
        }
        if let Some(email) = &inst.email {
            println!("       {}", email);
        }
    }
    Ok(())
}

// --- donations ---

pub fn doar(ctx: &Context, demanda_id: i64) -> Result<()> {
    let user = require_login(ctx)?;
    let doador_id = (user.tipo == UserKind::Doador).then_some(user.id);
    let doacao = ctx.api.registrar_doacao(demanda_id, doador_id)?;
    println!(
        "Doação #{} registrada (status: {})",
        doacao.id,
        doacao.status.as_deref().unwrap_or("Aguardando")
    );
    Ok(())
}

pub fn doacoes_minhas(ctx: &Context) -> Result<()> {
    let user = require_login(ctx)?;
    let doacoes = ctx.api.doacoes_por_doador(user.id)?;
    print_doacoes(&doacoes);
    Ok(())
}

pub fn doacoes_demanda(ctx: &Context, demanda_id: i64) -> Result<()> {
    let doacoes = ctx.api.doacoes_por_demanda(demanda_id)?;
    print_doacoes(&doacoes);
    Ok(())
}

pub fn doacao_status(ctx: &Context, doacao_id: i64, status: String) -> Result<()> {
    require_instituicao(ctx)?;
    let doacao = ctx.api.atualizar_status_doacao(doacao_id, &status)?;
    println!(
        "Doação #{} agora está {}",
        doacao.id,
        doacao.status.as_deref().unwrap_or(&status)
    );
    Ok(())
}

fn print_doacoes(doacoes: &[Doacao]) {
    if doacoes.is_empty() {
        println!("No donations found");
        return;
    }
    for doacao in doacoes {
        let quando = doacao
            .data
            .map(|data| data.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let alvo = doacao
            .demanda
            .as_ref()
            .map(|demanda| format!("demanda #{} {}", demanda.id, demanda.titulo))
            .unwrap_or_else(|| "demanda ?".to_string());
        println!(
            "#{:<5} {:<10} {:<16} {}",
            doacao.id,
            doacao.status.as_deref().unwrap_or("?"),
            quando,
            alvo
        );
    }
}

// --- cep ---

pub fn cep_lookup(cep: &str) -> Result<()> {
    let endereco = cep::lookup(cep)?;
    println!("{}: {}", endereco.cep, endereco.linha());
    Ok(())
}

// --- watch ---

/// Poll the shared session scope and report changes made by other processes.
/// This is the cross-tab half of the notification contract: our own writes
/// notify synchronously, everyone else's arrive through the storage medium.
pub fn watch(ctx: &Context, interval_secs: u64) -> Result<()> {
    let storage = FileStorage::new(&ctx.config.data_dir());
    let keys = [session::TOKEN_KEY, session::USER_KEY];

    let session = Rc::clone(&ctx.session);
    ctx.session
        .on_change(move || println!("session changed: {}", describe(&session)));

    println!(
        "watching {} (every {}s), currently {}",
        ctx.config.data_dir().display(),
        interval_secs,
        describe(&ctx.session)
    );

    let mut last = storage.fingerprint(&keys);
    loop {
        std::thread::sleep(Duration::from_secs(interval_secs.max(1)));
        let current = storage.fingerprint(&keys);
        for (i, key) in keys.iter().enumerate() {
            if current[i] != last[i] {
                ctx.session.external_change(key);
            }
        }
        last = current;
    }
}

fn describe(session: &SessionStore) -> String {
    match session.user() {
        Some(user) if session.is_logged_in() => {
            format!("logged in as {} ({})", user.nome, user.tipo)
        }
        _ if session.is_logged_in() => "logged in (no cached profile)".to_string(),
        _ => "logged out".to_string(),
    }
}
