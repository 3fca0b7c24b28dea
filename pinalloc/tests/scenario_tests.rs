//! Allocation rules on small hand-built packages

use pinalloc::model::*;
use pinalloc::prelude::*;
use pinalloc::validate::check_bindings;
use pinalloc::Infeasibility;

fn usart(instance: u32, symbol: UsartSignal) -> PhysicalSignal {
    PhysicalSignal::new(
        format!("USART{}_{}", instance, symbol.name()),
        PeripheralType::Usart,
        instance,
        SubSignal::Named(Symbol::Usart(symbol)),
    )
}

fn gpio_a(number: u32) -> PhysicalSignal {
    PhysicalSignal::new("GPIO", PeripheralType::Gpio, 1, SubSignal::Channel(number))
}

fn console() -> FeatureRequest {
    FeatureRequest::explicit(
        "console",
        PeripheralType::Usart,
        vec![Symbol::Usart(UsartSignal::Tx), Symbol::Usart(UsartSignal::Rx)],
    )
}

fn strict() -> AllocationOptions {
    AllocationOptions::new(SignalPolicy::Strict)
}

fn pins_of(result: &AllocationResult, feature: &str) -> Vec<String> {
    result
        .features
        .iter()
        .find(|f| f.name == feature)
        .map(|f| f.bindings.iter().map(|b| b.pin.clone()).collect())
        .unwrap_or_default()
}

fn console_and_led_pins() -> Vec<PhysicalPin> {
    vec![
        PhysicalPin::new(0, "P0", 1, vec![usart(1, UsartSignal::Tx), gpio_a(0)]),
        PhysicalPin::new(1, "P1", 2, vec![usart(1, UsartSignal::Rx), gpio_a(1)]),
        PhysicalPin::new(2, "P2", 3, vec![gpio_a(5)]),
    ]
}

#[test]
fn test_console_and_led_feasible() {
    let model = CapabilityModel::new(console_and_led_pins());
    let features = FeatureSet::new(vec![
        console(),
        FeatureRequest::anonymous("led", PeripheralType::Gpio, 1),
    ]);

    let result = PinAllocCore::allocate(&model, &features, &strict()).expect("Should be feasible");
    assert_eq!(pins_of(&result, "console"), vec!["P0", "P1"]);
    assert_eq!(pins_of(&result, "led"), vec!["P2"]);
    assert_eq!(result.features[0].instance_label(), "USART1");
}

#[test]
fn test_console_and_led_infeasible_without_third_pin() {
    let mut pins = console_and_led_pins();
    pins.truncate(2);
    let model = CapabilityModel::new(pins);
    let features = FeatureSet::new(vec![
        console(),
        FeatureRequest::anonymous("led", PeripheralType::Gpio, 1),
    ]);

    for options in [strict(), strict().without_presolve()] {
        let err = PinAllocCore::allocate(&model, &features, &options).unwrap_err();
        assert!(matches!(err, PinAllocError::Infeasible(_)), "Got {:?}", err);
    }
}

#[test]
fn test_gpio_features_may_share_a_bank() {
    let model = CapabilityModel::new(vec![
        PhysicalPin::new(0, "PA0", 1, vec![gpio_a(0)]),
        PhysicalPin::new(1, "PA1", 2, vec![gpio_a(1)]),
    ]);
    let features = FeatureSet::new(vec![
        FeatureRequest::anonymous("gpio_a", PeripheralType::Gpio, 1),
        FeatureRequest::anonymous("gpio_b", PeripheralType::Gpio, 1),
    ]);

    let result = PinAllocCore::allocate(&model, &features, &strict()).expect("Should be feasible");
    assert_eq!(result.features[0].instance, result.features[1].instance);
    assert_ne!(pins_of(&result, "gpio_a"), pins_of(&result, "gpio_b"));
}

#[test]
fn test_adc_features_may_share_an_instance() {
    let adc = |n| PhysicalSignal::new(format!("ADC1_IN{}", n), PeripheralType::Adc, 1, SubSignal::Channel(n));
    let model = CapabilityModel::new(vec![
        PhysicalPin::new(0, "PA0", 1, vec![adc(1)]),
        PhysicalPin::new(1, "PA1", 2, vec![adc(2)]),
    ]);
    let features = FeatureSet::new(vec![
        FeatureRequest::anonymous("vbat", PeripheralType::Adc, 1),
        FeatureRequest::anonymous("temp", PeripheralType::Adc, 1),
    ]);

    let result = PinAllocCore::allocate(&model, &features, &strict()).expect("Should be feasible");
    assert_eq!(result.features[0].instance_label(), "ADC1");
    assert_eq!(result.features[1].instance_label(), "ADC1");
}

#[test]
fn test_two_uarts_need_two_instances() {
    let only_usart1 = vec![
        PhysicalPin::new(0, "PA9", 19, vec![usart(1, UsartSignal::Tx)]),
        PhysicalPin::new(1, "PA10", 20, vec![usart(1, UsartSignal::Rx)]),
        PhysicalPin::new(2, "PB6", 29, vec![usart(1, UsartSignal::Tx)]),
        PhysicalPin::new(3, "PB7", 30, vec![usart(1, UsartSignal::Rx)]),
    ];
    let mut modem = console();
    modem.name = "modem".to_string();
    let features = FeatureSet::new(vec![console(), modem]);

    let err = PinAllocCore::allocate(&CapabilityModel::new(only_usart1.clone()), &features, &strict())
        .unwrap_err();
    assert!(matches!(err, PinAllocError::Infeasible(Infeasibility::Proven)));

    let mut with_usart2 = only_usart1;
    with_usart2.truncate(2);
    with_usart2.push(PhysicalPin::new(2, "PA2", 8, vec![usart(2, UsartSignal::Tx)]));
    with_usart2.push(PhysicalPin::new(3, "PA3", 9, vec![usart(2, UsartSignal::Rx)]));
    let model = CapabilityModel::new(with_usart2);

    let result = PinAllocCore::allocate(&model, &features, &strict()).expect("Should be feasible");
    assert_ne!(result.features[0].instance, result.features[1].instance);
    assert!(check_bindings(&model, &features.features, &result.features).is_empty());
}

#[test]
fn test_instance_must_be_shared_within_feature() {
    // TX only on USART1, RX only on USART2
    let model = CapabilityModel::new(vec![
        PhysicalPin::new(0, "PA9", 19, vec![usart(1, UsartSignal::Tx)]),
        PhysicalPin::new(1, "PA3", 9, vec![usart(2, UsartSignal::Rx)]),
    ]);
    let features = FeatureSet::new(vec![console()]);

    let err = PinAllocCore::allocate(&model, &features, &strict()).unwrap_err();
    assert!(matches!(err, PinAllocError::Infeasible(Infeasibility::Proven)));
}

#[test]
fn test_invalid_requests_are_rejected_before_solving() {
    let model = CapabilityModel::new(console_and_led_pins());

    let zero = FeatureSet::new(vec![FeatureRequest::anonymous("nothing", PeripheralType::Gpio, 0)]);
    assert!(matches!(
        PinAllocCore::allocate(&model, &zero, &strict()),
        Err(PinAllocError::Request(_))
    ));

    let duplicate = FeatureSet::new(vec![console(), console()]);
    assert!(matches!(
        PinAllocCore::allocate(&model, &duplicate, &strict()),
        Err(PinAllocError::Request(_))
    ));
}

#[test]
fn test_repeated_runs_stay_valid() {
    let model = CapabilityModel::new(vec![
        PhysicalPin::new(0, "PA0", 1, vec![gpio_a(0), usart(2, UsartSignal::Tx)]),
        PhysicalPin::new(1, "PA1", 2, vec![gpio_a(1), usart(2, UsartSignal::Rx)]),
        PhysicalPin::new(2, "PA2", 3, vec![gpio_a(2), usart(1, UsartSignal::Tx)]),
        PhysicalPin::new(3, "PA3", 4, vec![gpio_a(3), usart(1, UsartSignal::Rx)]),
        PhysicalPin::new(4, "PA4", 5, vec![gpio_a(4)]),
    ]);
    let features = FeatureSet::new(vec![
        console(),
        FeatureRequest::anonymous("leds", PeripheralType::Gpio, 3),
    ]);

    for _ in 0..3 {
        let result = PinAllocCore::allocate(&model, &features, &strict()).unwrap();
        assert!(check_bindings(&model, &features.features, &result.features).is_empty());
    }
}
