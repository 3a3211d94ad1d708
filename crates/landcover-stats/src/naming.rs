//! File naming conventions that carry the map year.
//!
//! Land-cover products encode the year after the `-P1Y-` period marker,
//! e.g. `ESACCI-LC-L4-LCCS-Map-300m-P1Y-1995-v2.0.7cds.nc` or
//! `C3S-LC-L4-LCCS-Map-300m-P1Y-2001-v2.1.1.nc`. New product families are
//! supported by registering another [`NamingConvention`]. The family tag
//! may appear anywhere in the name, so reprojected outputs such as
//! `reprojected_3035_C3S-...` are recognized too.

/// Period marker preceding the year.
pub const YEAR_MARKER: &str = "-P1Y-";

/// Recognizes one product family and extracts its year.
pub trait NamingConvention: Send + Sync {
    /// Short family name, e.g. `ESACCI`.
    fn name(&self) -> &str;

    /// Year encoded in `filename`, or `None` if the name is not of this family.
    fn extract_year(&self, filename: &str) -> Option<u16>;
}

/// Four ASCII digits directly after [`YEAR_MARKER`] and before a `-`.
fn year_after_marker(filename: &str) -> Option<u16> {
    let (_, rest) = filename.split_once(YEAR_MARKER)?;
    let (year, _) = rest.split_once('-')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

/// ESA Climate Change Initiative maps (1992-2015).
#[derive(Debug, Clone, Copy, Default)]
pub struct EsaCciConvention;

impl NamingConvention for EsaCciConvention {
    fn name(&self) -> &str {
        "ESACCI"
    }

    fn extract_year(&self, filename: &str) -> Option<u16> {
        if !filename.contains("ESACCI") {
            return None;
        }
        year_after_marker(filename)
    }
}

/// Copernicus Climate Change Service maps (2016 onwards).
#[derive(Debug, Clone, Copy, Default)]
pub struct C3sConvention;

impl NamingConvention for C3sConvention {
    fn name(&self) -> &str {
        "C3S"
    }

    fn extract_year(&self, filename: &str) -> Option<u16> {
        if !filename.contains("C3S") {
            return None;
        }
        year_after_marker(filename)
    }
}

/// Ordered set of conventions; the first one that matches wins.
pub struct ConventionRegistry {
    conventions: Vec<Box<dyn NamingConvention>>,
}

impl ConventionRegistry {
    /// Registry with no conventions.
    pub fn empty() -> Self {
        Self {
            conventions: Vec::new(),
        }
    }

    pub fn register(&mut self, convention: impl NamingConvention + 'static) -> &mut Self {
        self.conventions.push(Box::new(convention));
        self
    }

    /// `(convention name, year)` for the first convention recognizing `filename`.
    pub fn recognize(&self, filename: &str) -> Option<(&str, u16)> {
        self.conventions
            .iter()
            .find_map(|c| c.extract_year(filename).map(|year| (c.name(), year)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.conventions.iter().map(|c| c.name()).collect()
    }
}

impl Default for ConventionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(EsaCciConvention).register(C3sConvention);
        registry
    }
}

impl std::fmt::Debug for ConventionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConventionRegistry")
            .field("conventions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_conventions() {
        let registry = ConventionRegistry::default();
        assert_eq!(
            registry.recognize("ESACCI-LC-L4-LCCS-Map-300m-P1Y-1995-v2.0.7cds.nc"),
            Some(("ESACCI", 1995))
        );
        assert_eq!(
            registry.recognize("C3S-LC-L4-LCCS-Map-300m-P1Y-2001-v2.1.1.nc"),
            Some(("C3S", 2001))
        );
        // Reprojected outputs keep the product name after their prefix
        assert_eq!(
            registry.recognize("reprojected_3035_C3S-LC-L4-LCCS-Map-300m-P1Y-2016-v2.1.1.nc"),
            Some(("C3S", 2016))
        );
        assert_eq!(registry.recognize("landcover_2016.nc"), None);
    }

    #[test]
    fn test_year_edge_cases() {
        let esa = EsaCciConvention;
        // No delimiter after the year
        assert_eq!(esa.extract_year("ESACCI-LC-P1Y-1995.nc"), None);
        // Wrong number of digits
        assert_eq!(esa.extract_year("ESACCI-LC-P1Y-95-v2.nc"), None);
        assert_eq!(esa.extract_year("ESACCI-LC-P1Y-19955-v2.nc"), None);
        assert_eq!(esa.extract_year("ESACCI-LC-P1Y-19a5-v2.nc"), None);
        // No marker
        assert_eq!(esa.extract_year("ESACCI-LC-1995-v2.nc"), None);
        // Other family
        assert_eq!(esa.extract_year("C3S-LC-P1Y-2001-v2.nc"), None);
        assert_eq!(esa.extract_year("ESACCI-LC-P1Y-2015-v2.nc"), Some(2015));
    }

    struct Modis;

    impl NamingConvention for Modis {
        fn name(&self) -> &str {
            "MODIS"
        }

        fn extract_year(&self, filename: &str) -> Option<u16> {
            filename.strip_prefix("MCD12Q1.A")?.get(..4)?.parse().ok()
        }
    }

    #[test]
    fn test_register_additional_convention() {
        let mut registry = ConventionRegistry::default();
        assert_eq!(registry.recognize("MCD12Q1.A2010001.nc"), None);

        registry.register(Modis);
        assert_eq!(registry.recognize("MCD12Q1.A2010001.nc"), Some(("MODIS", 2010)));
        assert_eq!(registry.names(), vec!["ESACCI", "C3S", "MODIS"]);
    }
}
