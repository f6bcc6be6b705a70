use crate::config::Template;

/// A dealer site whose template is known
#[derive(Debug, Clone, Copy)]
pub struct KnownSite {
    pub name: &'static str,
    pub base_url: &'static str,
    pub template: Template,
    /// SimplePart path make, e.g. `Porsche` in `/p/Porsche__/`
    pub make: Option<&'static str>,
    pub category_path: Option<&'static str>,
}

const fn revolution(name: &'static str, base_url: &'static str, category_path: Option<&'static str>) -> KnownSite {
    KnownSite {
        name,
        base_url,
        template: Template::Revolution,
        make: None,
        category_path,
    }
}

const fn simplepart(name: &'static str, base_url: &'static str, make: &'static str) -> KnownSite {
    KnownSite {
        name,
        base_url,
        template: Template::SimplePart,
        make: Some(make),
        category_path: None,
    }
}

const fn generic(name: &'static str, base_url: &'static str, category_path: Option<&'static str>) -> KnownSite {
    KnownSite {
        name,
        base_url,
        template: Template::Generic,
        make: None,
        category_path,
    }
}

pub const KNOWN_SITES: &[KnownSite] = &[
    revolution("tascaparts", "https://www.tascaparts.com", Some("/c/wheelstiresparts")),
    revolution("acurapartswarehouse", "https://www.acurapartswarehouse.com", None),
    revolution("bmw", "https://parts.bmwofsouthatlanta.com", None),
    revolution("honda", "https://www.hondapartsonline.net", None),
    revolution("lexus", "https://lexus.oempartsonline.com", None),
    revolution("mbpartsource", "https://www.mbpartsource.com", None),
    revolution("moparonlineparts", "https://parts.moparonlineparts.com", None),
    revolution("nissan", "https://parts.nissanusa.com", None),
    simplepart("audiusa", "https://parts.audiusa.com", "Audi"),
    simplepart("ford", "https://parts.lakelandford.com", "Ford"),
    simplepart("jaguar", "https://parts.jaguarpalmbeach.com", "Jaguar"),
    simplepart("porsche", "https://parts.byersporsche.com", "Porsche"),
    simplepart("subaru", "https://parts.subaru.com", "Subaru"),
    simplepart("volkswagen", "https://parts.vw.com", "Volkswagen"),
    simplepart("mazda", "https://www.jimellismazdaparts.com", "Mazda"),
    simplepart("volvo", "https://usparts.volvocars.com", "Volvo"),
    generic("toyota", "https://autoparts.toyota.com", None),
    generic("infiniti", "https://www.infinitipartsdeal.com", Some("/oem-infiniti-spare_wheel.html")),
    generic("mitsubishi", "https://www.mitsubishipartswarehouse.com", Some("/accessories/mitsubishi-wheels.html")),
    generic("kia", "https://www.kiapartsnow.com", Some("/accessories/kia-wheels.html")),
    generic("scuderiacarparts", "https://www.scuderiacarparts.com", None),
];

pub fn known_site(name: &str) -> Option<&'static KnownSite> {
    KNOWN_SITES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let site = known_site("TascaParts").unwrap();
        assert_eq!(site.template, Template::Revolution);
        assert_eq!(site.category_path, Some("/c/wheelstiresparts"));
        assert_eq!(known_site("porsche").unwrap().make, Some("Porsche"));
        assert_eq!(known_site("Volvo").unwrap().make, Some("Volvo"));
        assert!(known_site("saab").is_none());
    }

    #[test]
    fn simplepart_sites_have_a_make() {
        assert_eq!(KNOWN_SITES.len(), 21);
        for site in KNOWN_SITES {
            assert_eq!(site.template == Template::SimplePart, site.make.is_some(), "{}", site.name);
            assert!(url::Url::parse(site.base_url).is_ok());
        }
    }

    #[test]
    fn every_dealer_site_is_listed() {
        for name in ["mazda", "toyota", "infiniti", "mitsubishi", "kia", "scuderiacarparts"] {
            assert!(known_site(name).is_some(), "{}", name);
        }
        assert_eq!(known_site("kia").unwrap().template, Template::Generic);
        assert_eq!(known_site("mazda").unwrap().template, Template::SimplePart);
    }
}
