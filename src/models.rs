//! Wire types shared with the Achados e Doados backend.
//!
//! Field names follow the backend's JSON exactly (Portuguese nouns,
//! camelCase composites), so these structs serialize straight onto the wire.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Account flavor, as reported by the backend on login.
///
/// `Usuario` is the base account type the server falls back to when a row is
/// neither donor nor institution; clients treat it like a donor with no
/// portal access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserKind {
    Doador,
    Instituicao,
    Usuario,
}

impl UserKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UserKind::Doador => "DOADOR",
            UserKind::Instituicao => "INSTITUICAO",
            UserKind::Usuario => "USUARIO",
        }
    }
}

impl std::fmt::Display for UserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user profile, cached by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub tipo: UserKind,
    #[serde(default, rename = "fotoUrl", skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
}

/// Institution entry from the public directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instituicao {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default, rename = "fotoUrl")]
    pub foto_url: Option<String>,
}

/// A material-need listing published by an institution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demanda {
    pub id: i64,
    pub titulo: String,
    pub categoria: String,
    pub descricao: String,
    /// Free-form quantity, e.g. "50 peças" or "10 kits".
    #[serde(default)]
    pub quantidade_descricao: Option<String>,
    /// "Ativo", "Aguardando" or "Concluído".
    #[serde(default)]
    pub status: Option<String>,
    /// "Baixa", "Média" or "Alta".
    #[serde(default)]
    pub nivel_urgencia: Option<String>,
    #[serde(default)]
    pub prazo_desejado: Option<NaiveDate>,
    #[serde(default)]
    pub meta_numerica: Option<i32>,
    #[serde(default)]
    pub instituicao: Option<Instituicao>,
}

/// Minimal identity of the donor attached to a donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoadorRef {
    pub id: i64,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Donation intent linking a donor to a demanda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doacao {
    pub id: i64,
    /// When the intent was registered.
    #[serde(default)]
    pub data: Option<NaiveDateTime>,
    /// "Aguardando", "Entregue" or "Cancelada".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub doador: Option<DoadorRef>,
    #[serde(default)]
    pub demanda: Option<Demanda>,
}

/// Registration payload for a donor account.
#[derive(Debug, Clone, Serialize)]
pub struct NovoDoador {
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endereco: Option<String>,
}

/// Registration payload for an institution account.
#[derive(Debug, Clone, Serialize)]
pub struct NovaInstituicao {
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endereco: Option<String>,
}

/// Create/update payload for a demanda in the institution portal.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandaInput {
    pub titulo: String,
    pub categoria: String,
    pub descricao: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade_descricao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nivel_urgencia: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prazo_desejado: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_numerica: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_login_payload() {
        let json = r#"{"id": 7, "nome": "Ana", "email": "a@x.com", "tipo": "DOADOR"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.tipo, UserKind::Doador);
        assert!(user.foto_url.is_none());
    }

    #[test]
    fn test_user_round_trips_with_foto_url() {
        let user = User {
            id: 3,
            nome: "Casa Abrigo".to_string(),
            email: "contato@abrigo.org".to_string(),
            tipo: UserKind::Instituicao,
            foto_url: Some("https://x/foto.png".to_string()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"fotoUrl\""));
        assert!(json.contains("\"INSTITUICAO\""));
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_demanda_parses_camel_case_fields() {
        let json = r#"{
            "id": 12,
            "titulo": "Agasalhos de inverno",
            "categoria": "Roupas",
            "descricao": "Casacos adulto e infantil",
            "quantidadeDescricao": "50 peças",
            "status": "Ativo",
            "nivelUrgencia": "Alta",
            "prazoDesejado": "2026-09-30",
            "metaNumerica": 50
        }"#;
        let demanda: Demanda = serde_json::from_str(json).unwrap();
        assert_eq!(demanda.quantidade_descricao.as_deref(), Some("50 peças"));
        assert_eq!(demanda.nivel_urgencia.as_deref(), Some("Alta"));
        assert_eq!(
            demanda.prazo_desejado,
            Some(NaiveDate::from_ymd_opt(2026, 9, 30).unwrap())
        );
        assert!(demanda.instituicao.is_none());
    }

    #[test]
    fn test_demanda_input_omits_unset_fields() {
        let input = DemandaInput {
            titulo: "Cestas básicas".to_string(),
            categoria: "Alimentos".to_string(),
            descricao: "Arroz, feijão e óleo".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("prazoDesejado"));
        assert!(!json.contains("metaNumerica"));
        assert!(json.contains("\"titulo\""));
    }
}
