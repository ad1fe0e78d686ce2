use super::parser::{DIRECTORIES_DECLARATION, escape_attribute};
use super::sed::SedFamily;
use crate::common::AssemblyParameters;
use crate::domain::{AssemblyResult, MetaRecord, PrepError, ViewSet};
use crate::modules::snapshot::GAS_TABLE;
use std::fmt::Write;

const PRODUCER: &str = "skirt-prep";
const INDENT: &str = "    ";

/// Everything the `.ski` document depends on, resolved before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SkiSettings {
    pub num_packets: f64,
    pub min_wavelength_micron: f64,
    pub max_wavelength_micron: f64,
    pub num_wavelengths: usize,
    pub distance_mpc: f64,
    pub pixels: usize,
    pub field_of_view_kpc: f64,
    pub r_cut_kpc: f64,
    pub dust_to_metals: f64,
    pub min_level: u32,
    pub max_level: u32,
    pub max_dust_fraction: f64,
    pub sed: SedFamily,
    /// Directories the simulator is run with, relative to the run directory.
    pub input_dir: String,
    pub output_dir: String,
    /// Producer timestamp; omitted when `None` so output is reproducible.
    pub timestamp: Option<String>,
}

impl SkiSettings {
    /// Combines assembly knobs, the shared camera distance and the values recorded at ingestion.
    pub fn resolve(
        params: &AssemblyParameters,
        distance_mpc: f64,
        meta: &MetaRecord,
        timestamp: Option<String>,
    ) -> AssemblyResult<Self> {
        let r_cut_kpc = meta.r_cut_kpc;
        if !r_cut_kpc.is_finite() || r_cut_kpc <= 0.0 {
            return Err(PrepError::assembly(
                "ASSEMBLY.META_RECORD",
                format!("meta record r_cut_kpc must be positive, got {}", r_cut_kpc),
            ));
        }
        let dust_to_metals = params.dust_to_metals.unwrap_or(meta.dust_to_metals);
        if !dust_to_metals.is_finite() || !(0.0..=1.0).contains(&dust_to_metals) {
            return Err(PrepError::assembly(
                "ASSEMBLY.META_RECORD",
                format!("dust_to_metals must lie in [0, 1], got {}", dust_to_metals),
            ));
        }

        Ok(Self {
            num_packets: params.num_packets,
            min_wavelength_micron: params.min_wavelength_micron,
            max_wavelength_micron: params.max_wavelength_micron,
            num_wavelengths: params.num_wavelengths,
            distance_mpc,
            pixels: params.pixels,
            field_of_view_kpc: params.field_of_view_kpc.unwrap_or(2.0 * r_cut_kpc),
            r_cut_kpc,
            dust_to_metals,
            min_level: params.min_level,
            max_level: params.max_level,
            max_dust_fraction: params.max_dust_fraction,
            sed: SedFamily::from_parameters(params)?,
            input_dir: params.input_dir.clone(),
            output_dir: params.output_dir.clone(),
            timestamp,
        })
    }
}

/// Shortest round-trip decimal form, always carrying a fractional part or exponent.
pub(crate) fn format_attribute_number(value: f64) -> String {
    format!("{value:?}")
}

struct XmlWriter {
    content: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            content: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.content.push_str(INDENT);
        }
        self.content.push_str(text);
        self.content.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    /// Writes `<property type="kind">` wrapping a single element.
    fn wrapped(&mut self, property: &str, kind: &str, element: &str) {
        self.open(&format!("<{property} type=\"{kind}\">"));
        self.line(element);
        self.close(&format!("</{property}>"));
    }
}

/// Renders an extinction-only Monte Carlo simulation with one frame instrument per view.
pub fn render_ski(settings: &SkiSettings, views: &ViewSet) -> AssemblyResult<String> {
    if views.is_empty() {
        return Err(PrepError::empty_result(
            "RUN.ZERO_VIEWS",
            "view set is empty; generate views before assembling the configuration",
        ));
    }

    let number = format_attribute_number;
    let min_wavelength = format!("{} micron", number(settings.min_wavelength_micron));
    let max_wavelength = format!("{} micron", number(settings.max_wavelength_micron));
    let mut xml = XmlWriter::new();
    xml.line(&format!("<!-- SKIRT parameter file generated by {PRODUCER} -->"));
    // The simulator takes these as -i/-o; post-run checks read them back.
    xml.line(&format!(
        "<!-- {DIRECTORIES_DECLARATION} input=\"{}\" output=\"{}\" -->",
        escape_attribute(&settings.input_dir),
        escape_attribute(&settings.output_dir)
    ));

    let mut root = format!(
        "<skirt-simulation-hierarchy type=\"MonteCarloSimulation\" format=\"9\" producer=\"{PRODUCER}\""
    );
    if let Some(timestamp) = &settings.timestamp {
        let _ = write!(root, " time=\"{}\"", escape_attribute(timestamp));
    }
    root.push('>');
    xml.open(&root);
    xml.open(&format!(
        "<MonteCarloSimulation userLevel=\"Regular\" simulationMode=\"ExtinctionOnly\" iteratePrimaryEmission=\"false\" iterateSecondaryEmission=\"false\" numPackets=\"{}\">",
        number(settings.num_packets)
    ));
    xml.wrapped("random", "Random", "<Random seed=\"0\"/>");
    xml.wrapped(
        "units",
        "Units",
        "<ExtragalacticUnits wavelengthOutputStyle=\"Wavelength\" fluxOutputStyle=\"Frequency\"/>",
    );
    xml.wrapped("cosmology", "Cosmology", "<LocalUniverseCosmology/>");

    xml.open("<sourceSystem type=\"SourceSystem\">");
    xml.open(&format!(
        "<SourceSystem minWavelength=\"{min_wavelength}\" maxWavelength=\"{max_wavelength}\" sourceBias=\"0.5\">"
    ));
    xml.open("<sources type=\"Source\">");
    xml.open(&format!(
        "<ParticleSource filename=\"{}\">",
        escape_attribute(settings.sed.star_table())
    ));
    xml.wrapped("sedFamily", "SEDFamily", settings.sed.xml_element());
    xml.close("</ParticleSource>");
    xml.close("</sources>");
    xml.close("</SourceSystem>");
    xml.close("</sourceSystem>");

    let r_cut = number(settings.r_cut_kpc);
    let neg_r_cut = number(-settings.r_cut_kpc);
    xml.open("<mediumSystem type=\"MediumSystem\">");
    xml.open("<MediumSystem>");
    xml.open("<media type=\"Medium\">");
    xml.open(&format!(
        "<ParticleMedium filename=\"{GAS_TABLE}\" massFraction=\"{}\" importMetallicity=\"true\">",
        number(settings.dust_to_metals)
    ));
    xml.wrapped("materialMix", "MaterialMix", "<ThemisDustMix/>");
    xml.close("</ParticleMedium>");
    xml.close("</media>");
    xml.open("<grid type=\"SpatialGrid\">");
    xml.open(&format!(
        "<PolicyTreeSpatialGrid minX=\"{neg_r_cut} kpc\" maxX=\"{r_cut} kpc\" minY=\"{neg_r_cut} kpc\" maxY=\"{r_cut} kpc\" minZ=\"{neg_r_cut} kpc\" maxZ=\"{r_cut} kpc\">"
    ));
    xml.wrapped(
        "policy",
        "TreePolicy",
        &format!(
            "<DensityTreePolicy minLevel=\"{}\" maxLevel=\"{}\" maxDustFraction=\"{}\"/>",
            settings.min_level,
            settings.max_level,
            number(settings.max_dust_fraction)
        ),
    );
    xml.close("</PolicyTreeSpatialGrid>");
    xml.close("</grid>");
    xml.close("</MediumSystem>");
    xml.close("</mediumSystem>");

    xml.open("<instrumentSystem type=\"InstrumentSystem\">");
    xml.open("<InstrumentSystem>");
    xml.wrapped(
        "defaultWavelengthGrid",
        "WavelengthGrid",
        &format!(
            "<LogWavelengthGrid minWavelength=\"{min_wavelength}\" maxWavelength=\"{max_wavelength}\" numWavelengths=\"{}\"/>",
            settings.num_wavelengths
        ),
    );
    xml.open("<instruments type=\"Instrument\">");
    let distance = number(settings.distance_mpc);
    let fov = format!("{:.6}", settings.field_of_view_kpc);
    for view in views.iter() {
        xml.line(&format!(
            "<FrameInstrument instrumentName=\"{}\" distance=\"{distance} Mpc\" inclination=\"{:.6} deg\" azimuth=\"{:.6} deg\" roll=\"0 deg\" fieldOfViewX=\"{fov} kpc\" fieldOfViewY=\"{fov} kpc\" numPixelsX=\"{}\" numPixelsY=\"{}\"/>",
            view.instrument_name(),
            view.theta_deg,
            view.phi_deg,
            settings.pixels,
            settings.pixels
        ));
    }
    xml.close("</instruments>");
    xml.close("</InstrumentSystem>");
    xml.close("</instrumentSystem>");

    xml.wrapped("probeSystem", "ProbeSystem", "<ProbeSystem/>");
    xml.close("</MonteCarloSimulation>");
    xml.close("</skirt-simulation-hierarchy>");
    Ok(xml.content)
}

#[cfg(test)]
mod tests {
    use super::{SkiSettings, format_attribute_number, render_ski};
    use crate::common::AssemblyParameters;
    use crate::domain::{MetaRecord, ParticleCounts, PrepErrorCategory};
    use crate::modules::assembly::parser::{ConfigurationDocument, parse_instruments};
    use crate::modules::views::generate_view_set;
    use serde_json::json;

    fn meta() -> MetaRecord {
        serde_json::from_value(json!({
            "r_cut_kpc": 30.0,
            "dust_to_metals": 0.4,
            "pos_to_kpc": 1.0,
            "host_pos_to_kpc": 1.0,
            "mass_to_msun": 1.0,
            "metallicity_scale": 1.0,
            "metallicity_column": 0,
            "counts": ParticleCounts::default(),
        }))
        .expect("minimal meta record")
    }

    fn settings(params: &AssemblyParameters, timestamp: Option<String>) -> SkiSettings {
        SkiSettings::resolve(params, 10.0, &meta(), timestamp).expect("settings resolve")
    }

    #[test]
    fn attribute_numbers_keep_a_decimal_point() {
        assert_eq!(format_attribute_number(10.0), "10.0");
        assert_eq!(format_attribute_number(200000.0), "200000.0");
        assert_eq!(format_attribute_number(0.4), "0.4");
        assert_eq!(format_attribute_number(-30.0), "-30.0");
    }

    #[test]
    fn one_instrument_per_view_at_the_shared_distance() {
        let views = generate_view_set(5).expect("views");
        let ski = render_ski(&settings(&AssemblyParameters::default(), None), &views)
            .expect("ski should render");
        let instruments = parse_instruments(&ski).expect("instruments");
        assert_eq!(instruments.len(), 5);
        for (index, instrument) in instruments.iter().enumerate() {
            assert_eq!(instrument.name, format!("view_{index:03}"));
            assert_eq!(instrument.distance, 10.0);
            assert_eq!(instrument.distance_unit, "Mpc");
        }
        assert!(ski.contains("fieldOfViewX=\"60.000000 kpc\""));
        assert!(ski.contains("minX=\"-30.0 kpc\" maxX=\"30.0 kpc\""));
        assert!(ski.contains("massFraction=\"0.4\""));
        assert!(ski.contains("<ParticleSource filename=\"stars.txt\">"));
        assert!(ski.contains("<BruzualCharlotSEDFamily imf=\"Chabrier\" resolution=\"Low\"/>"));
        assert!(ski.contains("numWavelengths=\"200\""));
        assert!(!ski.contains("time="));
    }

    #[test]
    fn simulator_directories_are_declared_and_read_back() {
        let views = generate_view_set(2).expect("views");
        let ski = render_ski(&settings(&AssemblyParameters::default(), None), &views)
            .expect("ski should render");
        assert!(ski.contains("<!-- directories input=\".\" output=\".\" -->"));

        let params = AssemblyParameters {
            input_dir: "tables".to_string(),
            output_dir: "out & images".to_string(),
            ..AssemblyParameters::default()
        };
        let ski = render_ski(&settings(&params, None), &views).expect("ski should render");
        let document = ConfigurationDocument::parse(ski).expect("document");
        assert_eq!(document.input_dir.as_deref(), Some("tables"));
        assert_eq!(document.output_dir.as_deref(), Some("out & images"));
        assert_eq!(document.instruments.len(), 2);
    }

    #[test]
    fn rendering_is_deterministic_without_a_timestamp() {
        let views = generate_view_set(3).expect("views");
        let settings = settings(&AssemblyParameters::default(), None);
        assert_eq!(
            render_ski(&settings, &views).expect("first"),
            render_ski(&settings, &views).expect("second")
        );
    }

    #[test]
    fn timestamp_and_overrides_are_honored() {
        let params = AssemblyParameters {
            field_of_view_kpc: Some(12.5),
            dust_to_metals: Some(0.25),
            sed_family: "BlackBodySEDFamily".to_string(),
            ..AssemblyParameters::default()
        };
        let views = generate_view_set(1).expect("views");
        let ski = render_ski(&settings(&params, Some("2026-01-02T03:04:05".to_string())), &views)
            .expect("ski should render");
        assert!(ski.contains("time=\"2026-01-02T03:04:05\""));
        assert!(ski.contains("fieldOfViewY=\"12.500000 kpc\""));
        assert!(ski.contains("massFraction=\"0.25\""));
        assert!(ski.contains("<ParticleSource filename=\"stars_bb.txt\">"));
        assert!(ski.contains("<BlackBodySEDFamily/>"));
    }

    #[test]
    fn empty_views_and_bad_meta_are_rejected() {
        let mut views = generate_view_set(2).expect("views");
        views.views.clear();
        let error = render_ski(&settings(&AssemblyParameters::default(), None), &views)
            .expect_err("no views");
        assert_eq!(error.category(), PrepErrorCategory::EmptyResultError);

        let mut bad = meta();
        bad.r_cut_kpc = 0.0;
        let error = SkiSettings::resolve(&AssemblyParameters::default(), 10.0, &bad, None)
            .expect_err("zero cut radius");
        assert_eq!(error.category(), PrepErrorCategory::AssemblyError);
    }
}
