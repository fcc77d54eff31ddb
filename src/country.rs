use crate::r#const::outbound_names;

// 无国家代码或无法识别时使用的图标
const GLOBE: &str = "🌐";

/// 国家代码对应的旗帜图标
///
/// 两位字母代码映射到区域指示符；`OTHER` 及其他非法代码返回地球图标。
pub fn emoji(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    if code == outbound_names::OTHER
        || code.len() != 2
        || !code.bytes().all(|b| b.is_ascii_uppercase())
    {
        return GLOBE.to_string();
    }

    code.bytes()
        .filter_map(|b| char::from_u32(0x1F1E6 + u32::from(b - b'A')))
        .collect()
}

// 国家代码对应的显示名称，未收录的代码原样返回
pub fn display_name(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    let name = match code.as_str() {
        "HK" => "Hong Kong",
        "TW" => "Taiwan",
        "MO" => "Macau",
        "CN" => "China",
        "JP" => "Japan",
        "KR" => "South Korea",
        "SG" => "Singapore",
        "MY" => "Malaysia",
        "TH" => "Thailand",
        "VN" => "Vietnam",
        "PH" => "Philippines",
        "ID" => "Indonesia",
        "IN" => "India",
        "US" => "United States",
        "CA" => "Canada",
        "MX" => "Mexico",
        "BR" => "Brazil",
        "AR" => "Argentina",
        "GB" | "UK" => "United Kingdom",
        "DE" => "Germany",
        "FR" => "France",
        "NL" => "Netherlands",
        "IT" => "Italy",
        "ES" => "Spain",
        "CH" => "Switzerland",
        "SE" => "Sweden",
        "PL" => "Poland",
        "RU" => "Russia",
        "UA" => "Ukraine",
        "TR" => "Turkey",
        "AE" => "United Arab Emirates",
        "IL" => "Israel",
        "AU" => "Australia",
        "NZ" => "New Zealand",
        "ZA" => "South Africa",
        "OTHER" => "Other",
        _ => return code,
    };
    name.to_string()
}

// 国家分组名称：图标 + 显示名称
pub fn group_name(code: &str) -> String {
    format!("{} {}", emoji(code), display_name(code))
}
