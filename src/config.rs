use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Versioned lookup tables driving report categorization.
///
/// These are the rules that change when the bank renames a history label or
/// the accounting office revises the nature classification; keeping them in
/// the config file means a rule update never requires a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rulebook {
    pub version: u32,

    /// History label for transfers into the interest-bearing sub-account.
    pub auto_application_label: String,
    /// History label for transfers out of the interest-bearing sub-account.
    pub auto_redemption_label: String,
    /// History label for sub-account income entries.
    pub income_label: String,
    /// History label of the synthetic opening-balance row.
    pub opening_label: String,
    /// Bank carry-over row dropped during cleaning.
    pub prior_balance_label: String,

    /// Federal pass-through (FNDE) history labels.
    pub fnde_repasse_labels: Vec<String>,
    pub vaaf_label: String,
    pub vaat_label: String,
    pub vaar_label: String,
    pub vaar_adjustment_label: String,

    pub canceled_orders_label: String,
    pub received_transfer_labels: Vec<String>,
    pub daf_quota_label: String,

    /// Expense-nature codes classified as basic-education payroll.
    pub payroll_natures: Vec<String>,
    /// Expense-nature codes classified as other expenses.
    pub other_natures: Vec<String>,
    pub payroll_classification: String,
    pub other_classification: String,

    /// Upper-case month names as used by the transfers workbook, in order.
    pub month_names: Vec<String>,
}

impl Default for Rulebook {
    fn default() -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            version: 1,
            auto_application_label: "BB-APLIC C.PRZ-APL.AUT".to_string(),
            auto_redemption_label: "Resgate Automático".to_string(),
            income_label: "RENDIMENTOS".to_string(),
            opening_label: "SALDO INICIAL".to_string(),
            prior_balance_label: "Saldo Anterior".to_string(),
            fnde_repasse_labels: owned(&[
                "IPVA",
                "IPI/EXPORTACAO",
                "FPE/FPM",
                "RECEBIMENTO DE ICMS",
                "ITR",
                "ITCMD",
            ]),
            vaaf_label: "VAAF Complemento FUNDEB".to_string(),
            vaat_label: "VAAT Complemento FUNDEB".to_string(),
            vaar_label: "VAAR Complemento FUNDEB".to_string(),
            vaar_adjustment_label: "Ajuste Complemento VAAR".to_string(),
            canceled_orders_label: "ORDEM BANC CANCELADA".to_string(),
            received_transfer_labels: owned(&[
                "Devolução",
                "Dep Cheque BB Liquidado",
                "Transferência recebida",
                "TED Devolvida",
                "TED-Crédito em Conta",
                "Transferido da poupança",
            ]),
            daf_quota_label: "COTA DAF-DEBITO".to_string(),
            payroll_natures: owned(&[
                "319004 - Contratação por Tempo Determinado ",
                "319011 - Vencimentos e Vantagens Fixas - Pessoal Civil",
                "319013 - Obrigações Patronais",
                "319016 - Outras Despesas Variáveis - Pessoal Civil",
                "319094 - Indenizações e Restituições Trabalhistas ",
                "319113 - Obrigações Patronais",
            ]),
            other_natures: owned(&[
                "339046 - Auxílio-Alimentação",
                "339039 - Outros Serviços de Terceiros - Pessoa Jurídica ",
                "449052 - Equipamentos e Material Permanente ",
                "335041 - Contribuições ",
            ]),
            payroll_classification:
                "Despesas com Remuneração dos Profissionais da Educação Básica".to_string(),
            other_classification: "Outras Despesas".to_string(),
            month_names: owned(&[
                "JANEIRO",
                "FEVEREIRO",
                "MARÇO",
                "ABRIL",
                "MAIO",
                "JUNHO",
                "JULHO",
                "AGOSTO",
                "SETEMBRO",
                "OUTUBRO",
                "NOVEMBRO",
                "DEZEMBRO",
            ]),
        }
    }
}

impl Rulebook {
    /// Month number (1-12) for a month name, per the config map. Comparison
    /// is case-insensitive including accented letters ("Março" vs "MARÇO").
    pub fn month_number(&self, name: &str) -> Option<u32> {
        let wanted = name.trim().to_uppercase();
        self.month_names
            .iter()
            .position(|m| m.to_uppercase() == wanted)
            .map(|i| i as u32 + 1)
    }

    /// Classification for an expense-nature code, if the code is known.
    pub fn classify_nature(&self, nature: &str) -> Option<&str> {
        if self.payroll_natures.iter().any(|n| n == nature) {
            Some(self.payroll_classification.as_str())
        } else if self.other_natures.iter().any(|n| n == nature) {
            Some(self.other_classification.as_str())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rulebook: Rulebook,
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
}

pub fn app_paths(override_home: Option<PathBuf>) -> Result<AppPaths> {
    if let Some(home) = override_home {
        return Ok(AppPaths {
            config_dir: home.join("config"),
        });
    }

    let proj = ProjectDirs::from("com", "fundeb-recon", "fundeb-recon")
        .context("Failed to resolve platform directories")?;

    Ok(AppPaths {
        config_dir: proj.config_dir().to_path_buf(),
    })
}

pub fn load_or_init_config(paths: &AppPaths) -> Result<(AppConfig, PathBuf)> {
    fs::create_dir_all(&paths.config_dir)
        .with_context(|| format!("Failed to create config dir {}", paths.config_dir.display()))?;

    let cfg_path = paths.config_dir.join("config.json");
    if !cfg_path.exists() {
        let cfg = AppConfig::default();
        write_config(&cfg_path, &cfg)?;
        return Ok((cfg, cfg_path));
    }

    let raw = fs::read_to_string(&cfg_path)
        .with_context(|| format!("Failed to read {}", cfg_path.display()))?;
    let cfg: AppConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cfg_path.display()))?;

    Ok((cfg, cfg_path))
}

pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
