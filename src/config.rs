//! Build configuration.
//!
//! A [`ProposalConfig`] is assembled once (usually through
//! [`ProposalConfig::from_env`]) and handed to the generator by value. Every
//! component only sees the parts it needs.

use std::env;
use std::path::PathBuf;

use crate::style::{BrandPalette, ChartStyle, PageLayout, TableStyle};

/// Directory that receives the rendered artifacts and the finished proposals.
pub const OUTPUT_DIR_ENV: &str = "SOLAR_PROPOSAL_OUTPUT_DIR";

pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/propostas";

/// Where the bytes of an image asset come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for AssetSource {
    fn from(path: PathBuf) -> Self {
        AssetSource::Path(path)
    }
}

impl From<Vec<u8>> for AssetSource {
    fn from(bytes: Vec<u8>) -> Self {
        AssetSource::Bytes(bytes)
    }
}

/// Images that carry the brand on the cover and in the page header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BrandAssets {
    /// Full-bleed cover artwork. `None` draws a gradient in the brand colors.
    pub cover_background: Option<AssetSource>,
    /// Mark shown in the content page header. `None` prints the brand name instead.
    pub logo: Option<AssetSource>,
}

/// The fixed texts of the proposal.
///
/// Lines may use the inline markup understood by [`crate::richtext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanyProfile {
    pub brand_name: String,
    pub brand_tagline: String,
    /// Printed on the cover and in the content page header.
    pub document_title: String,
    /// Bottom line of every content page.
    pub footer_line: String,
    pub about: String,
    pub system_overview: String,
    pub warranty_intro: String,
    pub warranty_terms: Vec<String>,
    pub payment_intro: String,
    pub payment_options: Vec<String>,
    pub cost_benefit: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            brand_name: "LEVEL5".into(),
            brand_tagline: "ENGENHARIA ELÉTRICA".into(),
            document_title: "PROPOSTA COMERCIAL".into(),
            footer_line: "LEVEL5 Engenharia Elétrica".into(),
            about: "Somos uma empresa especializada no segmento de engenharia elétrica, com foco no \
                    desenvolvimento de projetos elétricos e na instalação de sistemas fotovoltaicos. \
                    Desde 2019, temos trabalhado para oferecer soluções eficientes e sustentáveis, \
                    sempre com alto padrão de qualidade. Ao longo de nossa trajetória, já realizamos \
                    mais de 700 projetos fotovoltaicos, contribuindo para a geração de energia limpa \
                    e a redução de custos energéticos de nossos clientes."
                .into(),
            system_overview: "O sistema fotovoltaico é composto principalmente por três componentes: \
                              painéis solares, inversor e medidor bidirecional. Os painéis captam a \
                              energia solar e a convertem em energia elétrica de corrente contínua \
                              (CC). Em seguida, o inversor transforma essa corrente contínua em \
                              corrente alternada (CA), que pode ser utilizada pelos equipamentos \
                              elétricos."
                .into(),
            warranty_intro: "A garantia do sistema fotovoltaico é composta por:".into(),
            warranty_terms: vec![
                "**Módulos Fotovoltaicos:** Garantia de desempenho linear de 25 anos e garantia \
                 contra defeitos de fabricação de 15 anos."
                    .into(),
                "**Inversor:** Garantia de 10 anos contra defeitos de fabricação.".into(),
                "**Estrutura de Fixação:** Garantia contra corrosão e defeitos de fabricação."
                    .into(),
                "**Serviço de Instalação:** Garantia de 1 ano.".into(),
            ],
            payment_intro: "Oferecemos diversas formas de pagamento:".into(),
            payment_options: vec![
                "**Pagamento à Vista:** Desconto especial.".into(),
                "**Financiamento Bancário:** Até 120 meses.".into(),
                "**Pagamento Parcelado:** Direto no cartão.".into(),
            ],
            cost_benefit: "O gráfico abaixo ilustra a produção estimada de energia mês a mês."
                .into(),
        }
    }
}

/// Everything a [`crate::generator::ProposalGenerator`] needs besides the input.
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalConfig {
    pub output_dir: PathBuf,
    pub palette: BrandPalette,
    pub chart: ChartStyle,
    pub table: TableStyle,
    pub page: PageLayout,
    pub company: CompanyProfile,
    pub assets: BrandAssets,
}

impl ProposalConfig {
    /// Default brand configuration writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            palette: BrandPalette::default(),
            chart: ChartStyle::default(),
            table: TableStyle::default(),
            page: PageLayout::default(),
            company: CompanyProfile::default(),
            assets: BrandAssets::default(),
        }
    }

    /// Default configuration with the output directory taken from
    /// `SOLAR_PROPOSAL_OUTPUT_DIR`, falling back to `/tmp/propostas`.
    pub fn from_env() -> Self {
        let output_dir = env::var_os(OUTPUT_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        Self::new(output_dir)
    }

    pub fn with_assets(mut self, assets: BrandAssets) -> Self {
        self.assets = assets;
        self
    }
}
