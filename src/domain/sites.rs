//! Directory of the communities the collector scrapes.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

pub const SITES: &[SiteInfo] = &[
    SiteInfo {
        code: "fmkorea",
        name: "에펨코리아",
        url: "https://www.fmkorea.com/",
    },
    SiteInfo {
        code: "humoruniv",
        name: "웃긴대학",
        url: "https://web.humoruniv.com/",
    },
    SiteInfo {
        code: "ruliweb",
        name: "루리웹",
        url: "https://bbs.ruliweb.com/",
    },
    SiteInfo {
        code: "etoland",
        name: "이토랜드",
        url: "https://www.etoland.co.kr/",
    },
    SiteInfo {
        code: "inven",
        name: "인벤",
        url: "https://www.inven.co.kr/",
    },
    SiteInfo {
        code: "clien",
        name: "클리앙",
        url: "https://www.clien.net/",
    },
    SiteInfo {
        code: "mlbpark",
        name: "MLB파크",
        url: "https://mlbpark.donga.com/",
    },
    SiteInfo {
        code: "ddanzi",
        name: "딴지일보",
        url: "https://www.ddanzi.com/",
    },
    SiteInfo {
        code: "bobaedream",
        name: "보배드림",
        url: "https://www.bobaedream.co.kr/",
    },
    SiteInfo {
        code: "ppomppu",
        name: "뽐뿌",
        url: "https://www.ppomppu.co.kr/",
    },
    SiteInfo {
        code: "slrclub",
        name: "SLR클럽",
        url: "https://www.slrclub.com/",
    },
    SiteInfo {
        code: "damoang",
        name: "다모앙",
        url: "https://damoang.net/",
    },
    SiteInfo {
        code: "dcinside",
        name: "디시인사이드",
        url: "https://gall.dcinside.com/",
    },
    SiteInfo {
        code: "dogdrip",
        name: "개드립",
        url: "https://www.dogdrip.net/",
    },
    SiteInfo {
        code: "theqoo",
        name: "더쿠",
        url: "https://theqoo.net/",
    },
    SiteInfo {
        code: "82cook",
        name: "82쿡",
        url: "https://www.82cook.com/",
    },
];

pub fn find(code: &str) -> Option<&'static SiteInfo> {
    SITES.iter().find(|site| site.code == code)
}

/// Human-readable community name, falling back to the raw code.
pub fn display_name(code: &str) -> &str {
    find(code).map(|site| site.name).unwrap_or(code)
}
