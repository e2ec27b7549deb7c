//! Built-in forms: the apartment inspection calculator and the renovation
//! order questionnaire.

use rust_decimal_macros::dec;

use super::definition::{Form, FormTexts};
use super::option::AddOn;
use super::step::{GalleryItem, OptionId, Step};
use crate::error::FormError;
use crate::pricing::{PriceRule, Tariff, TierTable};

pub const INSPECTION: &str = "inspection";
pub const RENOVATION: &str = "renovation";

/// Add-on ids of the inspection form. These double as callback data.
pub mod option_ids {
    use super::OptionId;

    pub const AREA_CHECK: OptionId = OptionId::new("area_check");
    pub const BANK_EVALUATION: OptionId = OptionId::new("bank_evaluation");
    pub const THERMAL_IMAGING_INSPECTION: OptionId = OptionId::new("thermal_imaging_inspection");
    pub const APARTMENT_PLAN: OptionId = OptionId::new("apartment_plan");
    pub const REPAIR_EXAMINATION: OptionId = OptionId::new("repair_examination");
    pub const LEGAL_PENALTY: OptionId = OptionId::new("legal_penalty");
    pub const RADIATION_MEASUREMENT: OptionId = OptionId::new("radiation_measurement");
    pub const THERMAL_IMAGING_REPORT: OptionId = OptionId::new("thermal_imaging_report");
    pub const SPECIALIST_VISIT: OptionId = OptionId::new("specialist_visit");
}

/// Every built-in form, validated.
pub fn builtin_forms() -> Result<Vec<Form>, FormError> {
    Ok(vec![inspection_form()?, renovation_form()?])
}

fn inspection_options() -> Vec<AddOn> {
    use option_ids::*;

    vec![
        AddOn::new(
            AREA_CHECK,
            "Проверка площади",
            "Замер фактической площади квартиры. Выполняется от руки на бланке компании.",
            PriceRule::Tiered(TierTable::new(
                dec!(200),
                dec!(300),
                dec!(400),
                dec!(500),
                dec!(600),
            )),
        ),
        AddOn::new(
            BANK_EVALUATION,
            "Оценка для банка",
            "Оценка квартиры для банка при ипотеке. Работаем со всеми банками",
            PriceRule::Flat(dec!(3500)),
        ),
        AddOn::new(
            THERMAL_IMAGING_INSPECTION,
            "Тепловизионный осмотр",
            "Проверка монтажных швов оконных блоков и фасадных стен на промерзание",
            PriceRule::Tiered(TierTable::new(
                dec!(1000),
                dec!(1500),
                dec!(2000),
                dec!(2500),
                dec!(3000),
            )),
        ),
        AddOn::new(
            APARTMENT_PLAN,
            "План квартиры в AutoCAD",
            "Подробный план квартиры с указанием размеров всех стен и высот",
            PriceRule::Tiered(TierTable::new(
                dec!(2500),
                dec!(3000),
                dec!(3500),
                dec!(4000),
                dec!(5000),
            )),
        ),
        AddOn::new(
            REPAIR_EXAMINATION,
            "Экспертиза ремонта",
            "Строительная экспертиза качества ремонтных работ для суда. Бесплатно при заказе юридических услуг.",
            PriceRule::Free,
        ),
        AddOn::new(
            LEGAL_PENALTY,
            "Юридическое взыскание",
            "Взыскание компенсации с застройщика за некачественный ремонт и нарушение сроков сдачи",
            PriceRule::Free,
        ),
        AddOn::new(
            RADIATION_MEASUREMENT,
            "Замер радиации",
            "Измерение уровня радиационного фона в помещениях квартиры",
            PriceRule::Flat(dec!(500)),
        ),
        AddOn::new(
            THERMAL_IMAGING_REPORT,
            "Тепловизионный отчет",
            "Отчет с термограммами и фотографиями промерзаний с приложением сертификатов",
            PriceRule::Flat(dec!(1500)),
        ),
        AddOn::new(
            SPECIALIST_VISIT,
            "Выезд специалиста НОПРИЗ или НОСТРОЙ",
            "Приемка квартиры специалистом из реестра НОПРИЗ или НОСТРОЙ, с предоставлением застройщику документов из реестра и СРО компании.",
            PriceRule::PerArea(dec!(40)),
        ),
    ]
}

/// Apartment acceptance inspection: area, room count, optional services,
/// priced with the observed tariff.
pub fn inspection_form() -> Result<Form, FormError> {
    let options = inspection_options();
    let offered = options.iter().map(|o| o.id).collect();

    let mut builder = Form::builder(INSPECTION, "Расчет стоимости приемки квартиры").texts(
        FormTexts {
            completed: "Спасибо! Заявка на приемку квартиры передана специалисту.",
            discarded: "Расчет сброшен. Начнём заново.",
            price_line: "Стоимость приемки квартиры составляет: {} руб.",
            ..FormTexts::default()
        },
    );
    for option in options {
        builder = builder.option(option);
    }

    builder
        .step(
            Step::numeric("house_area", "Площадь квартиры?")
                .then("rooms_number")
                .recorded_as("Площадь квартиры", "1. Площадь квартиры {} м2"),
        )
        .step(
            Step::choice(
                "rooms_number",
                "Кол-во комнат?",
                vec![vec!["1", "2"], vec!["3", "4"], vec!["Студия"]],
            )
            .then("user_choices")
            .recorded_as("Количество комнат", "2. Количество комнат: {}"),
        )
        .step(Step::toggles(
            "user_choices",
            "Выберите дополнительные услуги:",
            offered,
            "продолжить",
        ))
        .tariff(Tariff::new("house_area", Some("rooms_number")))
        .build()
}

/// Renovation order questionnaire. Not priced; the operator quotes it.
pub fn renovation_form() -> Result<Form, FormError> {
    Form::builder(RENOVATION, "Оформление заказа на ремонт")
        .texts(FormTexts {
            intro: "Для отмены набейте \"cancel\".\nОтветьте, пожалуйста, на ряд вопросов:",
            discarded: "В таком случае снова заполните анкету.",
            ..FormTexts::default()
        })
        .step(
            Step::choice(
                "overhauls_place",
                "Где планируется ремонт?",
                vec![
                    vec!["в новостройке"],
                    vec!["во вторичном жилье"],
                    vec!["в доме"],
                ],
            )
            .then("house_area")
            .recorded_as("Ремонт планируется", "1. Ремонт планируется {}"),
        )
        .step(
            Step::numeric("house_area", "Какая у вас площадь квартиры/дома?")
                .then("interior_style")
                .recorded_as(
                    "Площадь дома/квартиры",
                    "2. Площадь вашего дома/квартиры {} м2",
                ),
        )
        .step(
            Step::choice(
                "interior_style",
                "В каком стиле вы хотите интерьер?",
                vec![
                    vec!["классический", "лофт"],
                    vec!["минимализм", "неоклассика"],
                    vec!["современная классика"],
                    vec!["современный стиль"],
                    vec!["хайтек"],
                ],
            )
            .then("design_project")
            .recorded_as("Интерьер в стиле", "3. Вы хотите интерьер в стиле {}")
            .with_gallery(vec![
                GalleryItem::new("Classic_style.jpg", "классический"),
                GalleryItem::new("Hitech_style.jpg", "хайтек"),
                GalleryItem::new("Loft_style.jpg", "лофт"),
                GalleryItem::new("Minimalism_style.jpg", "минимализм"),
                GalleryItem::new("Modern_classic_style.jpg", "современная классика"),
                GalleryItem::new("Modern_style.jpg", "современный стиль"),
                GalleryItem::new("Neoclassic_style.jpg", "неоклассика"),
            ]),
        )
        .step(
            Step::choice(
                "design_project",
                "Нужен ли дизайн-проект?",
                vec![vec!["Да", "Нет"], vec!["Пока думаю"]],
            )
            .then("overhauls_date")
            .recorded_as("Нужен ли дизайн проект?", "4. Нужен ли вам дизайн проект? {}"),
        )
        .step(
            Step::choice(
                "overhauls_date",
                "Когда планируете начать ремонт?",
                vec![
                    vec!["в течение 2-х недель"],
                    vec!["в течение этого месяца"],
                    vec!["в следующем месяце"],
                    vec!["другое"],
                ],
            )
            .then("address")
            .recorded_as("Начало ремонта", "5. Ремонт планируете начать {}"),
        )
        .step(
            Step::free_text("address", "Напишите название ЖК или адрес.")
                .then("your_location")
                .recorded_as("Адрес клиента", "6. Ваш адрес: {}"),
        )
        .step(
            Step::choice(
                "your_location",
                "Где вы будете находится во время ремонта?",
                vec![
                    vec!["в Набережных Челнах"],
                    vec!["в другом городе"],
                    vec!["другое"],
                ],
            )
            .then("how_to_tell")
            .recorded_as(
                "Во время ремонта клиент будет находиться",
                "7. Во время ремонта вы будете находится {}",
            ),
        )
        .step(
            Step::choice(
                "how_to_tell",
                "Как вам сообщить о результатах расчета стоимости?",
                vec![vec!["по WhatsApp", "в Telegram"], vec!["по телефону"]],
            )
            .then("phone_number")
            .recorded_as(
                "Стоимость ремонта сообщить",
                "8. Результаты расчета стоимости ремонта сообщить {}",
            ),
        )
        .step(
            Step::phone("phone_number", "Напишите свой номер телефона.", 6)
                .recorded_as("Телефон клиента", "9. Ваш номер телефона {}"),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Position, StepId, StepKind};

    #[test]
    fn builtin_forms_validate() {
        let forms = builtin_forms().unwrap();
        let ids: Vec<_> = forms.iter().map(|f| f.id().as_str()).collect();
        assert_eq!(ids, vec![INSPECTION, RENOVATION]);
    }

    #[test]
    fn inspection_chain() {
        let form = inspection_form().unwrap();
        assert_eq!(form.first_step(), StepId::new("house_area"));
        assert_eq!(
            form.step_after(StepId::new("user_choices")),
            Some(Position::Terminal)
        );
        assert_eq!(form.options().len(), 9);
        assert!(form.tariff().is_some());
    }

    #[test]
    fn renovation_chain_has_nine_steps_and_no_tariff() {
        let form = renovation_form().unwrap();
        assert_eq!(form.steps().len(), 9);
        assert!(form.tariff().is_none());
        assert!(!form.has_toggle_step());
        let last = form.steps().last().unwrap();
        assert_eq!(last.kind, StepKind::Phone { min_len: 6 });
        assert_eq!(last.next, None);
    }

    #[test]
    fn style_step_has_a_gallery_entry_per_choice() {
        let form = renovation_form().unwrap();
        let step = form.step(StepId::new("interior_style")).unwrap();
        let mut captions: Vec<_> = step.gallery.iter().map(|g| g.caption).collect();
        let mut choices: Vec<_> = step.kind.choices().collect();
        captions.sort();
        choices.sort();
        assert_eq!(captions, choices);
    }
}
