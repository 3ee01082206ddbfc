//! Dated folder names / 按日期生成文件夹名

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Folder name format / 文件夹命名格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FolderNameFormat {
    /// 2024-08-22_14h30
    #[default]
    #[serde(rename = "YYYY-MM-DD_HHhMM")]
    DateTimeSlug,
    /// 2024/08/22
    #[serde(rename = "YYYY/MM/DD")]
    HierarchicalDate,
    /// 22-08-2024_14-30
    #[serde(rename = "DD-MM-YYYY_HH-MM")]
    EuropeanFormat,
    /// 20240822_1430
    #[serde(rename = "YYYYMMDD_HHMM")]
    CompactFormat,
}

impl From<&str> for FolderNameFormat {
    fn from(s: &str) -> Self {
        match s.trim() {
            "YYYY-MM-DD_HHhMM" | "dateTimeSlug" => FolderNameFormat::DateTimeSlug,
            "YYYY/MM/DD" | "hierarchicalDate" => FolderNameFormat::HierarchicalDate,
            "DD-MM-YYYY_HH-MM" | "europeanFormat" => FolderNameFormat::EuropeanFormat,
            "YYYYMMDD_HHMM" | "compactFormat" => FolderNameFormat::CompactFormat,
            _ => FolderNameFormat::default(),
        }
    }
}

impl FolderNameFormat {
    pub const ALL: [FolderNameFormat; 4] = [
        FolderNameFormat::DateTimeSlug,
        FolderNameFormat::HierarchicalDate,
        FolderNameFormat::EuropeanFormat,
        FolderNameFormat::CompactFormat,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FolderNameFormat::DateTimeSlug => "YYYY-MM-DD_HHhMM",
            FolderNameFormat::HierarchicalDate => "YYYY/MM/DD",
            FolderNameFormat::EuropeanFormat => "DD-MM-YYYY_HH-MM",
            FolderNameFormat::CompactFormat => "YYYYMMDD_HHMM",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FolderNameFormat::DateTimeSlug => "Date and time",
            FolderNameFormat::HierarchicalDate => "Hierarchical date",
            FolderNameFormat::EuropeanFormat => "European format",
            FolderNameFormat::CompactFormat => "Compact format",
        }
    }
}

/// Generate folder name for the given moment / 根据时间生成文件夹名
pub fn generate_folder_name(format: FolderNameFormat, at: &NaiveDateTime) -> String {
    let (year, month, day) = (at.year(), at.month(), at.day());
    let (hour, minute) = (at.hour(), at.minute());

    match format {
        FolderNameFormat::DateTimeSlug => {
            format!("{}-{:02}-{:02}_{:02}h{:02}", year, month, day, hour, minute)
        }
        FolderNameFormat::HierarchicalDate => format!("{}/{:02}/{:02}", year, month, day),
        FolderNameFormat::EuropeanFormat => {
            format!("{:02}-{:02}-{}_{:02}-{:02}", day, month, year, hour, minute)
        }
        FolderNameFormat::CompactFormat => {
            format!("{}{:02}{:02}_{:02}{:02}", year, month, day, hour, minute)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_generate_folder_name() {
        let t = at(2024, 8, 22, 14, 30);
        assert_eq!(generate_folder_name(FolderNameFormat::DateTimeSlug, &t), "2024-08-22_14h30");
        assert_eq!(generate_folder_name(FolderNameFormat::HierarchicalDate, &t), "2024/08/22");
        assert_eq!(generate_folder_name(FolderNameFormat::EuropeanFormat, &t), "22-08-2024_14-30");
        assert_eq!(generate_folder_name(FolderNameFormat::CompactFormat, &t), "20240822_1430");
    }

    #[test]
    fn test_zero_padding() {
        let t = at(2025, 1, 5, 7, 3);
        assert_eq!(generate_folder_name(FolderNameFormat::DateTimeSlug, &t), "2025-01-05_07h03");
        assert_eq!(generate_folder_name(FolderNameFormat::EuropeanFormat, &t), "05-01-2025_07-03");
        assert_eq!(generate_folder_name(FolderNameFormat::CompactFormat, &t), "20250105_0703");
    }

    #[test]
    fn test_same_input_same_output() {
        let t = at(2024, 12, 31, 23, 59);
        for format in FolderNameFormat::ALL {
            assert_eq!(generate_folder_name(format, &t), generate_folder_name(format, &t));
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(FolderNameFormat::from("YYYY/MM/DD"), FolderNameFormat::HierarchicalDate);
        assert_eq!(FolderNameFormat::from("compactFormat"), FolderNameFormat::CompactFormat);
        assert_eq!(FolderNameFormat::from("DD-MM-YYYY_HH-MM"), FolderNameFormat::EuropeanFormat);
        assert_eq!(FolderNameFormat::from("unknown"), FolderNameFormat::DateTimeSlug);
        assert_eq!(FolderNameFormat::from(""), FolderNameFormat::DateTimeSlug);
    }

    #[test]
    fn test_key_round_trip() {
        for format in FolderNameFormat::ALL {
            assert_eq!(FolderNameFormat::from(format.key()), format);
        }
    }
}
