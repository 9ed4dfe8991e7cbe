use serde::Deserialize;

/// One entry of an entity's `aliases` list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AliasEntry {
    #[serde(alias = "alias")]
    pub name: String,
    #[serde(rename = "sort-name", default)]
    pub sort_name: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub primary: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub sort_name: Option<String>,
}

/// Picks a display name and sort name from the primary aliases.
///
/// Locales are tried in preference order, then aliases without a locale. The
/// name and the sort name are each taken from the first locale that provides
/// one, so they may come from different locales.
pub fn resolve_alias(aliases: &[AliasEntry], preferred_locales: &[String]) -> Option<Alias> {
    let mut name: Option<String> = None;
    let mut sort_name: Option<String> = None;
    let locales = preferred_locales
        .iter()
        .map(|locale| Some(locale.as_str()))
        .chain(std::iter::once(None));
    for locale in locales {
        let primary = aliases
            .iter()
            .find(|alias| alias.locale.as_deref() == locale && alias.primary == Some(true));
        let Some(primary) = primary else {
            continue;
        };
        if name.is_none() {
            name = Some(primary.name.clone());
        }
        if sort_name.is_none() {
            sort_name = primary.sort_name.clone();
        }
    }
    name.map(|name| Alias { name, sort_name })
}
