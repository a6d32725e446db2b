// lookout/src/catalog.rs
//
// Hardcoded catalog of shopping/coupon extensions worth warning visitors
// about. Each entry lists the signals the detector may probe for:
//
//   selectors: CSS selectors the extension injects into pages it runs on
//   resources: extension-scheme URLs of web-accessible resources, tagged
//               with the browser family whose scheme they use
//
// Firefox and Safari assign a random per-install UUID to each extension, so
// only Chromium-family resources can be listed statically.

use serde::Serialize;

use crate::browser::BrowserFamily;
use crate::events::DetectedExtension;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceProbe {
    pub family: BrowserFamily,
    pub url:    &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct KnownExtension {
    pub id:              &'static str,
    pub name:            &'static str,
    pub is_harmful:      bool,
    pub warning_message: Option<&'static str>,
    pub selectors:       &'static [&'static str],
    pub resources:       &'static [ResourceProbe],
}

impl KnownExtension {
    pub fn to_detected(&self) -> DetectedExtension {
        DetectedExtension {
            id:              self.id.to_string(),
            name:            self.name.to_string(),
            is_harmful:      self.is_harmful,
            warning_message: self.warning_message.map(str::to_string),
        }
    }

    /// Resource probes applicable to `family`.
    pub fn resources_for(&self, family: BrowserFamily) -> impl Iterator<Item = &ResourceProbe> {
        self.resources.iter().filter(move |r| r.family == family)
    }
}

const AFFILIATE_WARNING: &str =
    "This extension replaces creator affiliate links with its own at checkout.";

pub const KNOWN_EXTENSIONS: &[KnownExtension] = &[
    KnownExtension {
        id:              "honey",
        name:            "PayPal Honey",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#honeyContainer", "[id^=\"honey-\"]", "div[class*=\"honeyExtension\"]"],
        resources:       &[ResourceProbe {
            family: BrowserFamily::Chromium,
            url:    "chrome-extension://bmnlcjabgnpnenekpadlanbbkooimhnj/icons/icon48.png",
        }],
    },
    KnownExtension {
        id:              "rakuten",
        name:            "Rakuten Cash Back",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#rakuten-cashback-root", "[class*=\"rakuten-button\"]"],
        resources:       &[ResourceProbe {
            family: BrowserFamily::Chromium,
            url:    "chrome-extension://chhjbpecpncaggjpdakmflnfcopglcmi/images/icon-48.png",
        }],
    },
    KnownExtension {
        id:              "capital-one-shopping",
        name:            "Capital One Shopping",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#wikibuy-root", "[id^=\"capital-one-shopping\"]"],
        resources:       &[ResourceProbe {
            family: BrowserFamily::Chromium,
            url:    "chrome-extension://nenlahapcbofgnanklpelkaejcehkggg/images/logo.svg",
        }],
    },
    KnownExtension {
        id:              "retailmenot",
        name:            "RetailMeNot Deal Finder",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#rmn-deal-finder", "[class*=\"rmn-notification\"]"],
        resources:       &[ResourceProbe {
            family: BrowserFamily::Chromium,
            url:    "chrome-extension://jjfblogammkiefalfpafidabbnamoknm/img/icon48.png",
        }],
    },
    KnownExtension {
        id:              "karma",
        name:            "Karma",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#karma-extension-root", "[class*=\"karmanow\"]"],
        resources:       &[],
    },
    KnownExtension {
        id:              "coupert",
        name:            "Coupert",
        is_harmful:      true,
        warning_message: Some(AFFILIATE_WARNING),
        selectors:       &["#coupert-pop", "[id^=\"coupert-\"]"],
        resources:       &[ResourceProbe {
            family: BrowserFamily::Chromium,
            url:    "chrome-extension://mfidniedemcgceagapgdekdbmanojomk/img/logo.png",
        }],
    },
];

pub fn known_harmful_extensions() -> &'static [KnownExtension] {
    KNOWN_EXTENSIONS
}

pub fn find(id: &str) -> Option<&'static KnownExtension> {
    KNOWN_EXTENSIONS.iter().find(|e| e.id == id)
}
