use clap::ValueEnum;

use crate::dataset::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Lang {
    #[default]
    En,
    Uk,
}

/// User visible text for one locale.
#[derive(Debug)]
pub struct Labels {
    pub loading: &'static str,
    pub load_failed: &'static str,
    pub no_data: &'static str,
    pub all_types: &'static str,
    pub all_countries: &'static str,
    pub search: &'static str,
    pub type_filter: &'static str,
    pub country_filter: &'static str,
    pub updated: &'static str,
    pub scroll_top: &'static str,
    pub found: &'static str,
    pub help: &'static str,
    titles: [&'static str; Column::COUNT],
}

impl Labels {
    pub fn for_lang(lang: Lang) -> &'static Labels {
        match lang {
            Lang::En => &EN,
            Lang::Uk => &UK,
        }
    }

    pub fn title(&self, column: Column) -> &'static str {
        self.titles[column.index()]
    }
}

static EN: Labels = Labels {
    loading: "Loading…",
    load_failed: "Failed to load data",
    no_data: "No data",
    all_types: "All types",
    all_countries: "All countries",
    search: "Search",
    type_filter: "Type",
    country_filter: "Country",
    updated: "page updated",
    scroll_top: "↑ top <g>",
    found: "records",
    help: HELP_EN,
    titles: [
        "#",
        "Name",
        "Type",
        "Traffic limit",
        "Country",
        "Operating system",
        "Price",
        "Description",
    ],
};

static UK: Labels = Labels {
    loading: "Завантаження…",
    load_failed: "Помилка завантаження даних",
    no_data: "Немає даних",
    all_types: "Всі типи",
    all_countries: "Всі країни",
    search: "Пошук",
    type_filter: "Тип",
    country_filter: "Країна",
    updated: "сторінку оновлено",
    scroll_top: "↑ вгору <g>",
    found: "записів",
    help: HELP_UK,
    titles: [
        "№",
        "Назва",
        "Тип",
        "Ліміт трафіку",
        "Країна",
        "Операційна система",
        "Ціна",
        "Опис",
    ],
};

const HELP_EN: &str = "\
/        search in all columns (Esc clears)
t / T    next / previous type
c / C    next / previous country
x        clear search and filters
1 .. 8   sort by column (again to reverse)
s        sort by selected column
click    sort by clicked header
j k      move down / up
h l      select column left / right
g G      jump to top / bottom
d        toggle dark / light theme
?        this help
q        quit";

const HELP_UK: &str = "\
/        пошук у всіх колонках (Esc очищує)
t / T    наступний / попередній тип
c / C    наступна / попередня країна
x        скинути пошук і фільтри
1 .. 8   сортувати за колонкою (ще раз - у зворотному порядку)
s        сортувати за вибраною колонкою
клік     сортувати за заголовком
j k      вниз / вгору
h l      колонка ліворуч / праворуч
g G      на початок / в кінець
d        темна / світла тема
?        довідка
q        вихід";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_column_has_a_title_in_both_locales() {
        for column in Column::ALL {
            assert!(!Labels::for_lang(Lang::En).title(column).is_empty());
            assert!(!Labels::for_lang(Lang::Uk).title(column).is_empty());
        }
        assert_eq!(Labels::for_lang(Lang::Uk).title(Column::Price), "Ціна");
        assert_eq!(Labels::for_lang(Lang::En).title(Column::Id), "#");
    }
}
