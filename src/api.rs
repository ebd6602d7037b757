//! HTTP client for the Achados e Doados REST API.
//!
//! Thin wrappers over `ureq`: each call attaches the cached bearer token when
//! one exists, performs no retries, and maps HTTP-status errors to error
//! values carrying the status code and the server's `message` body when
//! present.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use std::rc::Rc;

use crate::models::{
    Demanda, DemandaInput, Doacao, DoadorRef, Instituicao, NovaInstituicao, NovoDoador, User,
};
use crate::session::SessionStore;

/// Successful login payload.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
    session: Rc<SessionStore>,
    verbose: bool,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Rc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
            session,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        if self.verbose {
            eprintln!("{} {}", method, url);
        }
        let mut req = self.agent.request(method, &url);
        if let Some(token) = self.session.token() {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }
        req
    }

    /// JSON POST with the bearer token attached when one is cached.
    ///
    /// Returns the raw response; checking the status and parsing the body is
    /// the caller's job. No retry, no timeout tuning.
    pub fn post_json(&self, path: &str, body: &Value) -> Result<ureq::Response, ureq::Error> {
        self.request("POST", path)
            .set("Content-Type", "application/json")
            .send_json(body)
    }

    // --- auth ---

    pub fn login(&self, email: &str, senha: &str) -> Result<LoginResponse> {
        let body = serde_json::json!({ "email": email, "senha": senha });
        let resp = self.post_json("/api/login", &body).map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    /// Best-effort server-side logout; a failure is reported on stderr and
    /// otherwise ignored, the local session is cleared by the caller anyway.
    pub fn logout(&self, token: &str) {
        let body = serde_json::json!({ "token": token });
        if let Err(e) = self.post_json("/api/logout", &body) {
            eprintln!("Warning: logout request failed: {}", api_error(e));
        }
    }

    /// Validate the cached token against the server and fetch the profile.
    pub fn me(&self) -> Result<User> {
        let resp = self.request("GET", "/api/me").call().map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    // --- registration ---

    pub fn cadastrar_doador(&self, novo: &NovoDoador) -> Result<DoadorRef> {
        let resp = self
            .post_json("/api/cadastro/doador", &serde_json::to_value(novo)?)
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn cadastrar_instituicao(&self, nova: &NovaInstituicao) -> Result<Instituicao> {
        let resp = self
            .post_json("/api/cadastro/instituicao", &serde_json::to_value(nova)?)
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    // --- public catalog ---

    pub fn demandas(&self, titulo: Option<&str>) -> Result<Vec<Demanda>> {
        let mut req = self.request("GET", "/api/demandas");
        if let Some(titulo) = titulo {
            req = req.query("titulo", titulo);
        }
        let resp = req.call().map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn demanda(&self, id: i64) -> Result<Demanda> {
        let resp = self
            .request("GET", &format!("/api/demandas/{}", id))
            .call()
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn instituicoes(&self) -> Result<Vec<Instituicao>> {
        let resp = self
            .request("GET", "/api/instituicoes")
            .call()
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    // --- institution portal ---

    pub fn criar_demanda(&self, instituicao_id: i64, input: &DemandaInput) -> Result<Demanda> {
        let path = format!("/api/portal/instituicoes/{}/demandas", instituicao_id);
        let resp = self
            .post_json(&path, &serde_json::to_value(input)?)
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn minhas_demandas(&self, instituicao_id: i64) -> Result<Vec<Demanda>> {
        let path = format!("/api/portal/instituicoes/{}/demandas", instituicao_id);
        let resp = self.request("GET", &path).call().map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn atualizar_demanda(
        &self,
        instituicao_id: i64,
        demanda_id: i64,
        input: &DemandaInput,
    ) -> Result<Demanda> {
        let path = format!(
            "/api/portal/instituicoes/{}/demandas/{}",
            instituicao_id, demanda_id
        );
        let resp = self
            .request("PUT", &path)
            .set("Content-Type", "application/json")
            .send_json(&serde_json::to_value(input)?)
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn excluir_demanda(&self, instituicao_id: i64, demanda_id: i64) -> Result<()> {
        let path = format!(
            "/api/portal/instituicoes/{}/demandas/{}",
            instituicao_id, demanda_id
        );
        self.request("DELETE", &path).call().map_err(api_error)?;
        Ok(())
    }

    // --- donations ---

    pub fn registrar_doacao(&self, demanda_id: i64, doador_id: Option<i64>) -> Result<Doacao> {
        let mut req = self
            .request("POST", "/api/doacoes")
            .query("demandaId", &demanda_id.to_string());
        if let Some(doador_id) = doador_id {
            req = req.query("doadorId", &doador_id.to_string());
        }
        let resp = req.call().map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn doacoes_por_doador(&self, doador_id: i64) -> Result<Vec<Doacao>> {
        let resp = self
            .request("GET", &format!("/api/doacoes/doador/{}", doador_id))
            .call()
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn doacoes_por_demanda(&self, demanda_id: i64) -> Result<Vec<Doacao>> {
        let resp = self
            .request("GET", &format!("/api/doacoes/demanda/{}", demanda_id))
            .call()
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }

    pub fn atualizar_status_doacao(&self, doacao_id: i64, status: &str) -> Result<Doacao> {
        let resp = self
            .request("PUT", &format!("/api/doacoes/{}/status", doacao_id))
            .query("status", status)
            .call()
            .map_err(api_error)?;
        Ok(resp.into_json()?)
    }
}

/// Convert a transport/status error into a readable error value, preferring
/// the `{"message": ...}` body the backend sends on 4xx.
fn api_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));
            match message {
                Some(msg) => anyhow!("API error {}: {}", code, msg),
                None if body.is_empty() => anyhow!("API error {}", code),
                None => anyhow!("API error {}: {}", code, body),
            }
        }
        other => anyhow!("Request failed: {}", other),
    }
}
