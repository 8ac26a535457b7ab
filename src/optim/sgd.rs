use crate::layers::param::Param;

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one SGD update to every parameter from its accumulated gradient.
    pub fn step(&self, params: &mut [&mut Param]) {
        let lr = self.learning_rate;
        for param in params.iter_mut() {
            let Param { value, grad } = &mut **param;
            for (w, g) in value.data.iter_mut().flatten().zip(grad.data.iter().flatten()) {
                *w -= lr * g;
            }
        }
    }
}
