//! CEP (Brazilian postal code) address lookup via the public ViaCEP service.
//!
//! Registration flows use this to prefill the address from the CEP the user
//! typed, the same way the web registration pages did on field blur.

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use serde_json::Value;

/// Address record returned by ViaCEP.
#[derive(Debug, Clone, Deserialize)]
pub struct Endereco {
    pub cep: String,
    #[serde(default)]
    pub logradouro: String,
    #[serde(default)]
    pub bairro: String,
    #[serde(default)]
    pub localidade: String,
    #[serde(default)]
    pub uf: String,
}

impl Endereco {
    /// Single-line rendering used for the `endereco` registration field.
    pub fn linha(&self) -> String {
        let mut parts = Vec::new();
        if !self.logradouro.is_empty() {
            parts.push(self.logradouro.clone());
        }
        if !self.bairro.is_empty() {
            parts.push(self.bairro.clone());
        }
        if !self.localidade.is_empty() {
            if self.uf.is_empty() {
                parts.push(self.localidade.clone());
            } else {
                parts.push(format!("{}/{}", self.localidade, self.uf));
            }
        }
        parts.join(", ")
    }
}

/// Strip formatting and validate the 8-digit CEP shape.
pub fn normalize(cep: &str) -> Result<String> {
    let digits: String = cep.chars().filter(|c| c.is_ascii_digit()).collect();
    let re = regex::Regex::new(r"^[0-9]{8}$")?;
    if !re.is_match(&digits) {
        bail!("invalid CEP {:?} (expected 8 digits)", cep);
    }
    Ok(digits)
}

/// Resolve a CEP to an address. Unknown CEPs are an error, not an empty
/// record.
pub fn lookup(cep: &str) -> Result<Endereco> {
    let digits = normalize(cep)?;
    let url = format!("https://viacep.com.br/ws/{}/json/", digits);
    let value: Value = ureq::Agent::new()
        .get(&url)
        .call()
        .map_err(|e| anyhow!("CEP lookup failed: {}", e))?
        .into_json()?;
    parse_response(&digits, value)
}

// ViaCEP answers 200 with {"erro": true} for a well-formed but unknown CEP
// (older deployments sent the string "true").
fn parse_response(digits: &str, value: Value) -> Result<Endereco> {
    let erro = match value.get("erro") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    };
    if erro {
        bail!("CEP {} not found", digits);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize("01310-100").unwrap(), "01310100");
        assert_eq!(normalize("01310100").unwrap(), "01310100");
        assert_eq!(normalize(" 01.310-100 ").unwrap(), "01310100");
    }

    #[test]
    fn test_normalize_rejects_wrong_length() {
        assert!(normalize("1234").is_err());
        assert!(normalize("123456789").is_err());
        assert!(normalize("abcdefgh").is_err());
    }

    #[test]
    fn test_parse_response_known_cep() {
        let value = serde_json::json!({
            "cep": "01310-100",
            "logradouro": "Avenida Paulista",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP"
        });
        let endereco = parse_response("01310100", value).unwrap();
        assert_eq!(endereco.uf, "SP");
        assert_eq!(
            endereco.linha(),
            "Avenida Paulista, Bela Vista, São Paulo/SP"
        );
    }

    #[test]
    fn test_parse_response_unknown_cep_is_error() {
        let value = serde_json::json!({ "erro": true });
        assert!(parse_response("99999999", value).is_err());

        let legacy = serde_json::json!({ "erro": "true" });
        assert!(parse_response("99999999", legacy).is_err());
    }
}
