//! Fixed description of the target portal: URLs, element identifiers and
//! candidate strategy lists. Nothing here is algorithmic.

use crate::selector::LocationStrategy;

pub const DEFAULT_LOGIN_URL: &str = "https://hr.wiwynn.com/psc/hcmprd/?cmd=login&languageCd=ZHT";

/// Label of the navigation step that opens the clock form
pub const CLOCK_STEP_LABEL: &str = "線上打卡";

/// What a confirmation dialog looks like and how to dismiss it.
#[derive(Debug, Clone)]
pub struct DialogProfile {
    /// Also treat a native `alert`/`confirm` as a dialog
    pub detect_native_alerts: bool,
    /// Any of these present means a dialog is showing
    pub signatures: Vec<LocationStrategy>,
    /// Where the dialog's message text lives
    pub message: Vec<LocationStrategy>,
    /// The control that confirms/dismisses the dialog
    pub confirm: Vec<LocationStrategy>,
    /// Phrases that mark the message as a duplicate-punch notice
    pub duplicate_markers: Vec<String>,
}

impl Default for DialogProfile {
    fn default() -> Self {
        Self {
            detect_native_alerts: true,
            signatures: vec![
                LocationStrategy::attribute_contains("div", "id", "ptModContent_"),
                LocationStrategy::id("alertmsg"),
                LocationStrategy::attribute_contains("div", "class", "PSMODAL"),
            ],
            message: vec![
                LocationStrategy::id("alertmsg"),
                LocationStrategy::attribute_contains("div", "id", "ptModContent_"),
                LocationStrategy::attribute_contains("span", "class", "popupText"),
            ],
            confirm: vec![
                LocationStrategy::id("ICOK"),
                LocationStrategy::attribute_contains("input", "id", "ICOK"),
                LocationStrategy::path("//input[@value='確定' or @value='OK' or @value='Yes' or @value='是']"),
                LocationStrategy::path(
                    "//button[normalize-space()='確定' or normalize-space()='OK' or normalize-space()='Yes']",
                ),
            ],
            duplicate_markers: ["已打卡", "重複", "已存在", "already", "duplicate"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Every fixed identifier the check-in flow needs
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub login_url: String,
    pub username_field: Vec<LocationStrategy>,
    pub password_field: Vec<LocationStrategy>,
    pub login_submit: Vec<LocationStrategy>,
    /// First menu ("my attendance / hours")
    pub menu_a: Vec<LocationStrategy>,
    /// Second menu ("time reporting")
    pub menu_b: Vec<LocationStrategy>,
    /// The navigation step that opens the clock form
    pub clock_step: Vec<LocationStrategy>,
    /// Activatable descendant to prefer when the step node is a container
    pub clock_step_link: LocationStrategy,
    /// The embedded document that hosts the clock form
    pub form_frame: Vec<LocationStrategy>,
    pub document_body: Vec<LocationStrategy>,
    pub punch_type: Vec<LocationStrategy>,
    pub save_button: Vec<LocationStrategy>,
    /// URL fragments that mean the login page is still showing
    pub login_page_markers: Vec<String>,
    pub dialog: DialogProfile,
}

impl SiteProfile {
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            username_field: vec![LocationStrategy::id("userid")],
            password_field: vec![LocationStrategy::id("pwd")],
            login_submit: vec![LocationStrategy::name("Submit")],
            menu_a: vec![LocationStrategy::id("win0groupletPTNUI_LAND_REC_GROUPLET$1")],
            menu_b: vec![LocationStrategy::id("Z_ESS_TIMEREPORTED$2")],
            clock_step: vec![
                LocationStrategy::path(format!(
                    "//div[@role='link' and @steplabel='{CLOCK_STEP_LABEL}']"
                )),
                LocationStrategy::path(format!(
                    "//div[contains(@id,'PTGP_STEP_DVW_PTGP_STEP_BTN_GB')][.//span[normalize-space()='{CLOCK_STEP_LABEL}']]"
                )),
                LocationStrategy::path(
                    "//*[@id='PTGP_STEP_DVW_PTGP_STEP_LABEL$3']/ancestor::div[contains(@id,'PTGP_STEP_DVW_PTGP_STEP_BTN_GB')]",
                ),
            ],
            clock_step_link: LocationStrategy::path(".//div[@role='link']"),
            form_frame: vec![LocationStrategy::attribute_contains(
                "iframe",
                "src",
                "TL_WEB_CLOCK",
            )],
            document_body: vec![LocationStrategy::tag("body")],
            punch_type: vec![
                LocationStrategy::id("TL_RPTD_TIME_PUNCH_TYPE$0"),
                LocationStrategy::name("TL_RPTD_TIME_PUNCH_TYPE$0"),
                LocationStrategy::attribute_contains("select", "id", "TL_RPTD_TIME_PUNCH_TYPE"),
                LocationStrategy::attribute_contains("select", "name", "TL_RPTD_TIME_PUNCH_TYPE"),
                LocationStrategy::path("//select[contains(@id, 'TL_RPTD_TIME_PUNCH_TYPE')]"),
            ],
            save_button: vec![
                LocationStrategy::id("TL_LINK_WRK_TL_SAVE_PB$0"),
                LocationStrategy::name("TL_LINK_WRK_TL_SAVE_PB$0"),
                LocationStrategy::attribute_contains("input", "id", "TL_LINK_WRK_TL_SAVE_PB"),
                LocationStrategy::path("//input[@value='輸入打卡' or @value='Save']"),
                LocationStrategy::path("//button[contains(text(),'輸入打卡') or contains(text(),'Save')]"),
            ],
            login_page_markers: vec!["login".to_string(), "signin".to_string()],
            dialog: DialogProfile::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Query;

    #[test]
    fn test_confirm_control_targets_the_bare_id() {
        let dialog = DialogProfile::default();
        assert_eq!(
            dialog.confirm[0].to_query(),
            Some(Query::Css("[id=\"ICOK\"]".to_string()))
        );
    }

    #[test]
    fn test_id_strategies_carry_no_css_prefix() {
        let site = SiteProfile::default();
        let all = [
            &site.username_field,
            &site.password_field,
            &site.login_submit,
            &site.menu_a,
            &site.menu_b,
            &site.punch_type,
            &site.save_button,
            &site.dialog.signatures,
            &site.dialog.message,
            &site.dialog.confirm,
        ];
        for strategy in all.into_iter().flatten() {
            if let LocationStrategy::Id(id) = strategy {
                assert!(!id.starts_with('#'), "{strategy} would never match");
            }
        }
    }
}
