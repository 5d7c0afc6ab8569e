// ラベル統合ルールの解決: 連鎖ルールの追跡と循環検出

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::PrepError;
use crate::labels::Labelled;
use crate::page::reserved_label_char;

/// 1つ以上のソースラベルを1つのターゲットラベルへ統合するルール。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRule {
    pub sources: Vec<String>,
    pub target: String,
}

impl MergeRule {
    pub fn new<S: Into<String>>(
        sources: impl IntoIterator<Item = S>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
        }
    }

    /// ルール文字列をパースする。
    ///
    /// 形式:
    /// - 単一ソース: `"src:target"`
    /// - 複数ソース（カンマ区切り）: `"src1,src2:target"`
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        let (lhs, rhs) = s.split_once(':').ok_or_else(|| {
            PrepError::config(format!(
                "Invalid merge rule '{s}': expected 'src:target' or 'src1,src2:target'"
            ))
        })?;
        if rhs.contains(':') {
            return Err(PrepError::config(format!(
                "Invalid merge rule '{s}': more than one ':'"
            )));
        }

        let target = rhs.trim();
        if target.is_empty() {
            return Err(PrepError::config(format!(
                "Invalid merge rule '{s}': empty target"
            )));
        }

        let sources: Vec<String> = lhs
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if sources.is_empty() {
            return Err(PrepError::config(format!(
                "Invalid merge rule '{s}': no source labels"
            )));
        }

        if let Some(c) = sources
            .iter()
            .map(String::as_str)
            .chain([target])
            .find_map(reserved_label_char)
        {
            return Err(PrepError::config(format!(
                "Invalid merge rule '{s}': labels cannot contain '{c}'"
            )));
        }

        Ok(Self {
            sources,
            target: target.to_string(),
        })
    }
}

/// 解決済みの統合マッピング（ソース → 最終ターゲット）。
///
/// 構築後は読み取り専用。マッピングにないラベルはそのまま返す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergeMapping {
    resolved: BTreeMap<String, String>,
}

impl MergeMapping {
    /// ルール群から有向グラフを構築し、各ラベルの最終ターゲットを求める。
    ///
    /// 同じソースに異なるターゲットを宣言した場合、および循環がある場合は
    /// 設定エラーとなる。結果はルールの入力順に依存しない。
    pub fn resolve_rules(rules: &[MergeRule]) -> crate::error::Result<Self> {
        let mut edges: BTreeMap<&str, &str> = BTreeMap::new();
        for rule in rules {
            for source in &rule.sources {
                match edges.get(source.as_str()) {
                    Some(existing) if *existing != rule.target => {
                        return Err(PrepError::config(format!(
                            "Ambiguous merge mapping: '{source}' is mapped to both '{existing}' and '{}'",
                            rule.target
                        )));
                    }
                    Some(_) => {}
                    None => {
                        edges.insert(source.as_str(), rule.target.as_str());
                    }
                }
            }
        }

        let mut resolved: BTreeMap<String, String> = BTreeMap::new();
        for &start in edges.keys() {
            if resolved.contains_key(start) {
                continue;
            }

            // 訪問中パスを保持して循環を検出する
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: BTreeSet<&str> = BTreeSet::new();
            let mut current = start;
            let terminal = loop {
                if let Some(done) = resolved.get(current) {
                    break done.clone();
                }
                let Some(&next) = edges.get(current) else {
                    break current.to_string();
                };
                path.push(current);
                on_path.insert(current);
                if on_path.contains(next) {
                    let pos = path.iter().position(|l| *l == next).unwrap_or(0);
                    let mut cycle = path[pos..].to_vec();
                    cycle.push(next);
                    return Err(PrepError::config(format!(
                        "Cyclic merge mapping: {}",
                        cycle.join(" -> ")
                    )));
                }
                current = next;
            };

            for label in path {
                resolved.insert(label.to_string(), terminal.clone());
            }
        }

        Ok(Self { resolved })
    }

    /// ルール文字列群をパースして解決する。
    pub fn from_rule_strings<S: AsRef<str>>(rules: &[S]) -> crate::error::Result<Self> {
        let parsed = rules
            .iter()
            .map(|r| MergeRule::parse(r.as_ref()))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Self::resolve_rules(&parsed)
    }

    /// ラベルの最終ターゲットを返す。
    pub fn resolve<'a>(&'a self, label: &'a str) -> &'a str {
        self.resolved.get(label).map_or(label, String::as_str)
    }

    /// 全エンティティのラベルを置き換える。
    pub fn apply<T: Labelled>(&self, items: &mut [T]) {
        if self.resolved.is_empty() {
            return;
        }
        for item in items {
            if let Some(target) = self.resolved.get(item.label()) {
                let target = target.clone();
                item.set_label(target);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.resolved.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
